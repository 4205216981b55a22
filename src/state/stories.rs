use crate::application_port::StoryService;
use crate::domain_model::*;
use crate::logger::*;
use crate::state::*;
use chrono::{Duration, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct StoryTrayState {
    pub stories: Vec<Story>,
    /// Index of the story open in the viewer.
    pub viewing: Option<usize>,
}

pub struct StoryTray {
    stories: Arc<dyn StoryService>,
    gate: ActionGate,
    confirm: Arc<dyn Confirm>,
    ids: Arc<LocalIdSource>,
    state: StateCell<StoryTrayState>,
    publishing: PendingSet<()>,
}

impl StoryTray {
    pub fn new(
        stories: Arc<dyn StoryService>,
        gate: ActionGate,
        confirm: Arc<dyn Confirm>,
        ids: Arc<LocalIdSource>,
    ) -> Self {
        StoryTray {
            stories,
            gate,
            confirm,
            ids,
            state: StateCell::default(),
            publishing: PendingSet::new(),
        }
    }

    pub fn stories(&self) -> Vec<Story> {
        self.state.read(|s| s.stories.clone())
    }

    /// Stories still waiting for the server.
    pub fn pending(&self) -> Vec<Story> {
        self.state
            .read(|s| s.stories.iter().filter(|st| st.is_pending()).cloned().collect())
    }

    pub fn is_publishing(&self) -> bool {
        self.publishing.is_pending(&())
    }

    pub async fn load(&self) -> Result<(), ActionError> {
        match self.stories.list().await {
            Ok(stories) => {
                self.state.update(|s| {
                    s.stories = stories;
                    s.viewing = None;
                });
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "fetch stories failed");
                Err(e.into())
            }
        }
    }

    pub async fn publish(
        &self,
        media_url: Option<&str>,
        text: Option<&str>,
    ) -> Result<Story, ActionError> {
        let me = self.gate.require_user()?;
        let new_story = NewStory::normalized(media_url, text).ok_or(ActionError::EmptyContent)?;
        let _pending = self.gate.begin(&self.publishing, ())?;

        let now = Utc::now();
        let local_id = StoryId(self.ids.next());
        let placeholder = Story {
            id: local_id,
            user_id: me.id,
            author: Some(me.as_author()),
            media_url: new_story.media_url.clone(),
            text: new_story.text.clone(),
            created_at: now,
            expires_at: now + Duration::hours(STORY_TTL_HOURS),
        };

        let result = reconcile(
            &self.state,
            |_| (),
            |s| s.stories.insert(0, placeholder),
            self.stories.create(&new_story),
            |s, server: Story| {
                if let Some(slot) = s.stories.iter_mut().find(|st| st.id == local_id) {
                    *slot = server.clone();
                }
                server
            },
            |s, ()| remove_story(s, local_id),
        )
        .await;

        self.gate
            .report(result, Some("Story published"), "Could not publish the story")
    }

    pub async fn delete(&self, story: StoryId) -> Result<(), ActionError> {
        self.gate.require_user()?;
        if !self.confirm.confirm("Delete this story?").await {
            return Err(ActionError::Cancelled);
        }

        let result = self.stories.delete(story).await;
        self.gate
            .report(result, Some("Story deleted"), "Could not delete the story")?;
        self.state.update(|s| remove_story(s, story));
        Ok(())
    }

    pub fn open(&self, index: usize) -> Option<Story> {
        self.state.update(|s| {
            let story = s.stories.get(index).cloned()?;
            s.viewing = Some(index);
            Some(story)
        })
    }

    pub fn current(&self) -> Option<Story> {
        self.state
            .read(|s| s.viewing.and_then(|i| s.stories.get(i).cloned()))
    }

    /// Moves forward; stepping past the last story closes the viewer.
    pub fn next(&self) -> Option<Story> {
        self.state.update(|s| {
            let next = s.viewing? + 1;
            if next < s.stories.len() {
                s.viewing = Some(next);
                s.stories.get(next).cloned()
            } else {
                s.viewing = None;
                None
            }
        })
    }

    /// Moves back, staying on the first story.
    pub fn previous(&self) -> Option<Story> {
        self.state.update(|s| {
            let previous = s.viewing?.saturating_sub(1);
            s.viewing = Some(previous);
            s.stories.get(previous).cloned()
        })
    }

    pub fn close(&self) {
        self.state.update(|s| s.viewing = None);
    }
}

fn remove_story(state: &mut StoryTrayState, id: StoryId) {
    let Some(index) = state.stories.iter().position(|st| st.id == id) else {
        return;
    };
    state.stories.remove(index);
    state.viewing = match state.viewing {
        Some(v) if v == index => None,
        Some(v) if v > index => Some(v - 1),
        other => other,
    };
}

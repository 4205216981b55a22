use crate::application_port::UserService;
use crate::domain_model::*;
use crate::logger::*;
use crate::state::*;
use std::sync::Arc;

/// Everyone on the network, as listed by the backend. Readable signed out.
pub struct UserDirectory {
    users: Arc<dyn UserService>,
    state: StateCell<Vec<User>>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserService>) -> Self {
        UserDirectory {
            users,
            state: StateCell::default(),
        }
    }

    pub fn list(&self) -> Vec<User> {
        self.state.snapshot()
    }

    /// A failed fetch leaves the directory empty.
    pub async fn load(&self) -> Vec<User> {
        let users = match self.users.list().await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "fetch users failed");
                Vec::new()
            }
        };
        debug!(count = users.len(), "users loaded");
        self.state.update(|s| *s = users.clone());
        users
    }

    /// Case-insensitive username match on the loaded list.
    pub fn search(&self, query: &str) -> Vec<User> {
        let query = query.trim().to_lowercase();
        self.state.read(|s| {
            s.iter()
                .filter(|u| u.username.to_lowercase().contains(&query))
                .cloned()
                .collect()
        })
    }
}

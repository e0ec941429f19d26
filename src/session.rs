//! In-process sessions and the flash message queue kept in them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";
pub const DEFAULT_CATEGORY: &str = "message";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
	pub category: String,
	pub message: String,
}

#[derive(Debug, Default)]
pub struct SessionData {
	pub user: Option<i64>,
	flashes: Vec<Flash>,
}

impl SessionData {
	pub fn take_flashes(&mut self) -> Vec<Flash> {
		std::mem::take(&mut self.flashes)
	}
}

#[derive(Debug, Clone)]
pub struct Session {
	id: Uuid,
	is_new: bool,
	saved: Arc<AtomicBool>,
	data: Arc<Mutex<SessionData>>,
	store: Arc<SessionStore>,
}

impl Session {
	/// An empty session that only enters the store once something is
	/// written to it.
	fn unsaved(store: Arc<SessionStore>) -> Self {
		Self {
			id: Uuid::new_v4(),
			is_new: true,
			saved: Arc::new(AtomicBool::new(false)),
			data: Arc::default(),
			store,
		}
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	/// True when the client has not been handed the session cookie yet.
	pub fn is_new(&self) -> bool {
		self.is_new
	}

	/// True once the session is held by the store.
	pub fn is_saved(&self) -> bool {
		self.saved.load(Ordering::Acquire)
	}

	async fn save(&self) {
		if !self.saved.swap(true, Ordering::AcqRel) {
			self.store.insert(self.id, Arc::clone(&self.data)).await;
			tracing::debug!(session = %self.id, "started session");
		}
	}

	pub async fn user(&self) -> Option<i64> {
		self.data.lock().await.user
	}

	pub async fn set_user(&self, user: Option<i64>) {
		self.data.lock().await.user = user;
		self.save().await;
	}

	/// Queue a message for the next request that renders flashes.
	///
	/// Recommended categories are `message`, `error`, `info` and `warning`
	/// but any string works.
	pub async fn flash<M: ToString>(&self, message: M, category: Option<&str>) {
		let flash = Flash {
			category: category.unwrap_or(DEFAULT_CATEGORY).to_owned(),
			message: message.to_string(),
		};

		self.data.lock().await.flashes.push(flash);
		self.save().await;
	}

	pub(crate) async fn take_flashes(&self) -> Vec<Flash> {
		self.data.lock().await.take_flashes()
	}

	/// Forget this session and start an empty one under a new id.
	pub async fn renew(&self) -> Session {
		self.store.remove(self.id).await;
		Session::unsaved(Arc::clone(&self.store))
	}

	pub fn cookie(&self) -> String {
		format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, self.id)
	}
}

#[derive(Debug, Default)]
pub struct SessionStore {
	sessions: RwLock<HashMap<Uuid, Arc<Mutex<SessionData>>>>,
}

impl SessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Look up the session named by a cookie value.
	///
	/// A missing, malformed or unknown value gives a fresh session that is
	/// stored on its first write.
	pub async fn load(self: &Arc<Self>, cookie: Option<&str>) -> Session {
		let known = cookie.and_then(|value| Uuid::parse_str(value).ok());

		if let Some(id) = known {
			if let Some(data) = self.sessions.read().await.get(&id) {
				return Session {
					id,
					is_new: false,
					saved: Arc::new(AtomicBool::new(true)),
					data: Arc::clone(data),
					store: Arc::clone(self),
				};
			}
		}

		Session::unsaved(Arc::clone(self))
	}

	async fn insert(&self, id: Uuid, data: Arc<Mutex<SessionData>>) {
		self.sessions.write().await.insert(id, data);
	}

	pub async fn remove(&self, id: Uuid) {
		if self.sessions.write().await.remove(&id).is_some() {
			tracing::debug!(session = %id, "ended session");
		}
	}

	pub async fn len(&self) -> usize {
		self.sessions.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}
}

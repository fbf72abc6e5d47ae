//! Profile service
//!
//! Renders profiles relative to an optional viewer and manages follow edges.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::Identity;
use crate::data::{Account, Database};
use crate::error::AppError;

/// A profile as seen by a particular viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub bio: String,
    pub image: String,
    /// Whether the viewer follows this profile; always false for anonymous viewers
    pub following: bool,
}

/// Profile service
pub struct ProfileService {
    db: Arc<Database>,
}

impl ProfileService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn find_target(&self, username: &str) -> Result<Account, AppError> {
        self.db
            .get_account_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// The viewer's token may outlive its account.
    async fn ensure_viewer_exists(&self, viewer: &Identity) -> Result<(), AppError> {
        match self.db.get_account_by_id(&viewer.account_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }

    /// Render `target` for `viewer`
    ///
    /// Anonymous viewers never trigger a relationship lookup. A failed lookup
    /// aborts rendering instead of reporting "not following".
    pub async fn render(
        &self,
        target: &Account,
        viewer: Option<&Identity>,
    ) -> Result<ProfileView, AppError> {
        let following = match viewer {
            None => false,
            Some(viewer) => self.db.follow_exists(&viewer.account_id, &target.id).await?,
        };

        Ok(ProfileView {
            username: target.username.clone(),
            bio: target.bio.clone(),
            image: target.image.clone(),
            following,
        })
    }

    /// Look up a profile by username
    pub async fn get_profile(
        &self,
        username: &str,
        viewer: Option<&Identity>,
    ) -> Result<ProfileView, AppError> {
        let target = self.find_target(username).await?;
        self.render(&target, viewer).await
    }

    /// Make `viewer` follow `username`
    ///
    /// # Errors
    /// - `NotFound` if no such profile or the viewer has no account
    /// - `Unprocessable` when following oneself
    /// - `Conflict` if already following; the existing edge is untouched
    pub async fn follow(&self, username: &str, viewer: &Identity) -> Result<ProfileView, AppError> {
        self.ensure_viewer_exists(viewer).await?;
        let target = self.find_target(username).await?;
        if target.id == viewer.account_id {
            return Err(AppError::Unprocessable("cannot follow yourself".to_string()));
        }

        self.db
            .insert_follow(&viewer.account_id, &target.id)
            .await?;

        crate::metrics::FOLLOWS_TOTAL
            .with_label_values(&["follow"])
            .inc();
        tracing::info!(
            follower_id = %viewer.account_id,
            followed_id = %target.id,
            "Follow created"
        );

        self.render(&target, Some(viewer)).await
    }

    /// Make `viewer` stop following `username`
    ///
    /// Unfollowing a profile that is not followed succeeds.
    pub async fn unfollow(
        &self,
        username: &str,
        viewer: &Identity,
    ) -> Result<ProfileView, AppError> {
        self.ensure_viewer_exists(viewer).await?;
        let target = self.find_target(username).await?;

        let removed = self
            .db
            .delete_follow(&viewer.account_id, &target.id)
            .await?;
        if removed {
            crate::metrics::FOLLOWS_TOTAL
                .with_label_values(&["unfollow"])
                .inc();
            tracing::info!(
                follower_id = %viewer.account_id,
                followed_id = %target.id,
                "Follow removed"
            );
        }

        self.render(&target, Some(viewer)).await
    }
}

//! The single application profile stored next to the secrets.

use parking_lot::RwLock;
use uuid::Uuid;

use super::record::{next_timestamp, validate_ident, AppSettings, AppSettingsUpdate, NewAppSettings};
use crate::errors::Result;

#[derive(Debug, Default)]
pub struct AppProfile {
    current: RwLock<Option<AppSettings>>,
}

impl AppProfile {
    pub fn from_settings(settings: Option<AppSettings>) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }

    pub fn get(&self) -> Option<AppSettings> {
        self.current.read().clone()
    }

    /// Install `new` unless a profile already exists.  Returns whether it did.
    pub fn seed(&self, new: NewAppSettings) -> Result<bool> {
        match self.stage_seed(new)? {
            Some(settings) => {
                self.replace(settings);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The profile `seed` would install, or `None` if one exists.
    pub fn stage_seed(&self, new: NewAppSettings) -> Result<Option<AppSettings>> {
        if self.current.read().is_some() {
            return Ok(None);
        }
        build(new).map(Some)
    }

    /// Replace the profile with a new one under a fresh id.
    pub fn set(&self, new: NewAppSettings) -> Result<AppSettings> {
        let settings = Self::stage_set(new)?;
        self.replace(settings.clone());
        Ok(settings)
    }

    pub fn stage_set(new: NewAppSettings) -> Result<AppSettings> {
        build(new)
    }

    /// Update the profile if `id` matches it.
    pub fn update(&self, id: Uuid, update: AppSettingsUpdate) -> Result<Option<AppSettings>> {
        let staged = self.stage_update(id, update)?;
        if let Some(settings) = &staged {
            self.replace(settings.clone());
        }
        Ok(staged)
    }

    /// The updated profile, without storing it.  `None` if `id` does not match.
    pub fn stage_update(
        &self,
        id: Uuid,
        update: AppSettingsUpdate,
    ) -> Result<Option<AppSettings>> {
        if let Some(app_id) = &update.app_id {
            validate_ident("app id", app_id)?;
        }
        if let Some(app_name) = &update.app_name {
            validate_ident("app name", app_name)?;
        }

        let Some(mut settings) = self.get().filter(|s| s.id == id) else {
            return Ok(None);
        };

        if let Some(app_id) = update.app_id {
            settings.app_id = app_id;
        }
        if let Some(app_name) = update.app_name {
            settings.app_name = app_name;
        }
        if let Some(description) = update.description {
            settings.description = description;
        }
        if let Some(is_active) = update.is_active {
            settings.is_active = is_active;
        }
        if let Some(metadata) = update.metadata {
            settings.metadata = metadata;
        }
        settings.updated_at = next_timestamp(Some(settings.updated_at));
        Ok(Some(settings))
    }

    pub fn replace(&self, settings: AppSettings) {
        *self.current.write() = Some(settings);
    }
}

fn build(new: NewAppSettings) -> Result<AppSettings> {
    validate_ident("app id", &new.app_id)?;
    validate_ident("app name", &new.app_name)?;

    let now = next_timestamp(None);
    Ok(AppSettings {
        id: Uuid::new_v4(),
        app_id: new.app_id,
        app_name: new.app_name,
        description: new.description,
        is_active: new.is_active,
        metadata: new.metadata,
        created_at: now,
        updated_at: now,
    })
}

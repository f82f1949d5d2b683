//! Theme management: CRUD, the single-active-theme switch, and variable
//! lookup for rendering.

use std::collections::BTreeMap;
use std::sync::Arc;

use domains::presets::{self, BUILTIN_THEMES, FALLBACK_IDENTIFIER};
use domains::{
    validate_theme_fields, validate_theme_variables, DomainError, DomainResult, NewTheme, Theme,
    ThemeChanges, ThemeRepository, ThemeVariable,
};
use uuid::Uuid;

/// Form input for creating or editing a theme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeUpsert {
    pub name: String,
    pub identifier: String,
    /// `None` keeps existing variables on edit, or uses the defaults on create.
    pub variables: Option<Vec<(String, String)>>,
    /// `Some(true)` activates, `Some(false)` deactivates, `None` leaves the flag alone.
    pub activate: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ThemeDetail {
    pub theme: Theme,
    pub variables: Vec<ThemeVariable>,
}

#[derive(Clone)]
pub struct ThemeService {
    repo: Arc<dyn ThemeRepository>,
}

impl ThemeService {
    pub fn new(repo: Arc<dyn ThemeRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_themes(&self) -> DomainResult<Vec<Theme>> {
        self.repo.list_themes().await
    }

    pub async fn active_theme(&self) -> DomainResult<Option<Theme>> {
        self.repo.find_active_theme().await
    }

    pub async fn theme_detail(&self, id: Uuid) -> DomainResult<ThemeDetail> {
        let theme = self.require(id).await?;
        let variables = self.repo.theme_variables(id).await?;
        Ok(ThemeDetail { theme, variables })
    }

    pub async fn create_theme(&self, input: ThemeUpsert) -> DomainResult<Theme> {
        let name = input.name.trim().to_string();
        let identifier = input.identifier.trim().to_string();
        validate_theme_fields(&name, &identifier)?;
        let variables = input.variables.unwrap_or_else(presets::default_variables);
        validate_theme_variables(&variables)?;
        self.ensure_identifier_free(&identifier, None).await?;

        let theme = self
            .repo
            .create_theme(NewTheme { name, identifier, variables })
            .await?;
        tracing::info!(theme_id = %theme.id, identifier = %theme.identifier, "theme created");

        if input.activate == Some(true) {
            return self.switch_theme(theme.id).await;
        }
        Ok(theme)
    }

    pub async fn update_theme(&self, id: Uuid, input: ThemeUpsert) -> DomainResult<Theme> {
        let current = self.require(id).await?;
        let name = input.name.trim().to_string();
        let identifier = input.identifier.trim().to_string();
        validate_theme_fields(&name, &identifier)?;
        if let Some(variables) = &input.variables {
            validate_theme_variables(variables)?;
        }
        self.ensure_identifier_free(&identifier, Some(id)).await?;

        let changes = ThemeChanges { name, identifier, variables: input.variables };
        self.repo
            .update_theme(id, changes)
            .await?
            .ok_or_else(|| DomainError::not_found("Theme", id))?;

        match input.activate {
            Some(true) if !current.is_active => {
                self.repo.activate_theme(id).await?;
            }
            Some(false) if current.is_active => {
                self.repo.deactivate_theme(id).await?;
            }
            _ => {}
        }
        tracing::info!(theme_id = %id, "theme updated");
        self.require(id).await
    }

    /// Deleting the active theme is refused; variables cascade with the theme.
    pub async fn delete_theme(&self, id: Uuid) -> DomainResult<Theme> {
        let theme = self.require(id).await?;
        if theme.is_active {
            return Err(cannot_delete_active());
        }
        // The delete is conditional on the theme still being inactive.
        if !self.repo.delete_inactive_theme(id).await? {
            return Err(cannot_delete_active());
        }
        tracing::info!(theme_id = %id, name = %theme.name, "theme deleted");
        Ok(theme)
    }

    pub async fn switch_theme(&self, id: Uuid) -> DomainResult<Theme> {
        if !self.repo.activate_theme(id).await? {
            return Err(DomainError::not_found("Theme", id));
        }
        tracing::info!(theme_id = %id, "active theme switched");
        self.require(id).await
    }

    /// Variables of the active theme; not-found when no theme is active.
    pub async fn active_variables(&self) -> DomainResult<BTreeMap<String, String>> {
        let theme = self
            .repo
            .find_active_theme()
            .await?
            .ok_or_else(|| DomainError::NotFound("Active theme".into(), "none".into()))?;
        let variables = self.repo.theme_variables(theme.id).await?;
        Ok(variables.into_iter().map(|v| (v.name, v.value)).collect())
    }

    /// Variables for page rendering. Never fails: no active theme, or a
    /// storage error, renders with an empty set.
    pub async fn render_variables(&self) -> BTreeMap<String, String> {
        match self.active_variables().await {
            Ok(vars) => vars,
            Err(DomainError::NotFound(..)) => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not load theme variables for rendering");
                BTreeMap::new()
            }
        }
    }

    /// Installs missing built-in presets and activates the fallback preset
    /// when nothing is active. Safe to run on every start.
    pub async fn install_builtin_themes(&self) -> DomainResult<usize> {
        let mut installed = 0;
        for preset in BUILTIN_THEMES {
            if self.repo.find_theme_by_identifier(preset.identifier).await?.is_some() {
                continue;
            }
            self.repo
                .create_theme(NewTheme {
                    name: preset.name.to_string(),
                    identifier: preset.identifier.to_string(),
                    variables: presets::owned(preset.variables),
                })
                .await?;
            installed += 1;
        }

        if self.repo.find_active_theme().await?.is_none() {
            if let Some(fallback) = self.repo.find_theme_by_identifier(FALLBACK_IDENTIFIER).await? {
                self.repo.activate_theme(fallback.id).await?;
            }
        }
        if installed > 0 {
            tracing::info!(installed, "built-in themes installed");
        }
        Ok(installed)
    }

    async fn require(&self, id: Uuid) -> DomainResult<Theme> {
        self.repo
            .find_theme(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Theme", id))
    }

    async fn ensure_identifier_free(&self, identifier: &str, owner: Option<Uuid>) -> DomainResult<()> {
        match self.repo.find_theme_by_identifier(identifier).await? {
            Some(existing) if Some(existing.id) != owner => Err(DomainError::Validation(format!(
                "a theme with identifier '{}' already exists",
                identifier
            ))),
            _ => Ok(()),
        }
    }
}

fn cannot_delete_active() -> DomainError {
    DomainError::Conflict("cannot delete active theme".into())
}

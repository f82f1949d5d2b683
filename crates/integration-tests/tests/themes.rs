use std::collections::BTreeMap;

use domains::{presets, DomainError};
use integration_tests::Harness;
use services::ThemeUpsert;

fn upsert(name: &str, identifier: &str, activate: Option<bool>) -> ThemeUpsert {
    ThemeUpsert {
        name: name.to_string(),
        identifier: identifier.to_string(),
        variables: None,
        activate,
    }
}

#[tokio::test]
async fn new_theme_gets_the_default_palette() {
    let h = Harness::new().await;
    let theme = h.services.themes.create_theme(upsert("Ocean", "ocean", None)).await.unwrap();
    assert!(!theme.is_active);

    let detail = h.services.themes.theme_detail(theme.id).await.unwrap();
    let names: Vec<&str> = detail.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["background", "border", "primary", "secondary", "shadow", "text"]);
    let primary = detail.variables.iter().find(|v| v.name == "primary").unwrap();
    assert_eq!(primary.value, "#007bff");
}

#[tokio::test]
async fn switching_leaves_exactly_one_active_theme() {
    let h = Harness::new().await;
    h.services.themes.install_builtin_themes().await.unwrap();
    assert_eq!(h.services.themes.active_theme().await.unwrap().unwrap().identifier, "light");

    let ocean = h.services.themes.create_theme(upsert("Ocean", "ocean", Some(true))).await.unwrap();
    assert!(ocean.is_active);

    let themes = h.services.themes.list_themes().await.unwrap();
    let active: Vec<_> = themes.iter().filter(|t| t.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, ocean.id);

    let vars = h.services.themes.active_variables().await.unwrap();
    let defaults: BTreeMap<String, String> = presets::default_variables().into_iter().collect();
    assert_eq!(vars, defaults);
}

#[tokio::test]
async fn builtin_install_is_idempotent() {
    let h = Harness::new().await;
    let first = h.services.themes.install_builtin_themes().await.unwrap();
    assert!(first > 0);
    assert_eq!(h.services.themes.install_builtin_themes().await.unwrap(), 0);
    assert_eq!(h.services.themes.list_themes().await.unwrap().len(), first);
}

#[tokio::test]
async fn duplicate_identifier_is_rejected() {
    let h = Harness::new().await;
    h.services.themes.create_theme(upsert("Ocean", "ocean", None)).await.unwrap();
    let err = h
        .services
        .themes
        .create_theme(upsert("Ocean Two", "ocean", None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn active_theme_cannot_be_deleted() {
    let h = Harness::new().await;
    let theme = h.services.themes.create_theme(upsert("Ocean", "ocean", Some(true))).await.unwrap();

    let err = h.services.themes.delete_theme(theme.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ref m) if m == "cannot delete active theme"));
    assert!(h.services.themes.theme_detail(theme.id).await.is_ok());
}

#[tokio::test]
async fn deleting_an_inactive_theme_removes_its_variables() {
    let h = Harness::new().await;
    h.services.themes.create_theme(upsert("Light", "light", Some(true))).await.unwrap();
    let ocean = h.services.themes.create_theme(upsert("Ocean", "ocean", None)).await.unwrap();

    h.services.themes.delete_theme(ocean.id).await.unwrap();
    assert!(matches!(
        h.services.themes.theme_detail(ocean.id).await,
        Err(DomainError::NotFound(..))
    ));
    assert_eq!(h.services.themes.list_themes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn editing_replaces_variables_and_can_deactivate() {
    let h = Harness::new().await;
    let theme = h.services.themes.create_theme(upsert("Ocean", "ocean", Some(true))).await.unwrap();

    let edit = ThemeUpsert {
        name: "Deep Ocean".into(),
        identifier: "ocean".into(),
        variables: Some(vec![("primary".into(), "#003366".into())]),
        activate: Some(false),
    };
    let updated = h.services.themes.update_theme(theme.id, edit).await.unwrap();
    assert_eq!(updated.name, "Deep Ocean");
    assert!(!updated.is_active);

    let detail = h.services.themes.theme_detail(theme.id).await.unwrap();
    assert_eq!(detail.variables.len(), 1);
    assert_eq!(detail.variables[0].value, "#003366");
    assert!(h.services.themes.render_variables().await.is_empty());
}

// Integration tests for layout composition

mod common;

use layoutd::assets::MemoryAssetStore;
use layoutd::{RenderError, RenderSettings, Renderer, RequestContext};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Serialize)]
struct Home {
    #[serde(rename = "Name")]
    name: String,
}

#[tokio::test]
async fn test_layout_wraps_body() {
    let renderer = common::renderer_with(&[
        ("layouts/application", "Header {{yield}} Footer"),
        ("home", "Hello {{.Name}}"),
    ]);

    let html = renderer
        .execute("home", &Home { name: "Ana".to_string() }, &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(html.as_str(), "Header Hello Ana Footer");
}

#[tokio::test]
async fn test_no_layout_configured_matches_direct_render() {
    let templates = [
        ("layouts/application", "Header {{yield}} Footer"),
        ("home", "Hello {{.Name}}"),
    ];
    let data = json!({"Name": "Ana"});
    let ctx = RequestContext::new();

    let settings = RenderSettings {
        default_layout: None,
        ..common::test_settings()
    };
    let renderer = Renderer::builder(settings)
        .asset_store(common::memory_store(&templates))
        .build();
    let no_layout = renderer.execute("home", &data, &ctx).await.unwrap();

    let direct = common::renderer_with(&templates)
        .template()
        .without_layout()
        .execute("home", &data, &ctx)
        .await
        .unwrap();

    assert_eq!(no_layout, direct);
    assert_eq!(direct.as_str(), "Hello Ana");
}

#[tokio::test]
async fn test_missing_default_layout_falls_back_to_body() {
    let renderer = common::renderer_with(&[("home", "Hello {{.Name}}")]);

    let html = renderer
        .execute("home", &json!({"Name": "Ana"}), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(html.as_str(), "Hello Ana");
}

#[tokio::test]
async fn test_missing_explicit_layout_is_fatal() {
    let renderer = common::renderer_with(&[
        ("layouts/application", "Header {{yield}} Footer"),
        ("home", "Hello"),
    ]);

    let err = renderer
        .layout("admin")
        .execute("home", &json!({}), &RequestContext::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RenderError::LayoutNotFound {
            layout: "layouts/admin".to_string()
        }
    );
}

#[tokio::test]
async fn test_explicit_layout_is_used() {
    let renderer = common::renderer_with(&[
        ("layouts/application", "App[{{yield}}]"),
        ("layouts/admin", "Admin[{{yield}}]"),
        ("home", "Hello"),
    ]);

    let html = renderer
        .layout("admin")
        .execute("home", &json!({}), &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(html.as_str(), "Admin[Hello]");
}

#[tokio::test]
async fn test_missing_body_under_layout_is_not_found() {
    let renderer = common::renderer_with(&[("layouts/application", "Header {{yield}} Footer")]);

    let err = renderer
        .execute("nope", &json!({}), &RequestContext::new())
        .await
        .unwrap_err();

    assert!(err.is_missing("nope"));
    assert_eq!(
        err,
        RenderError::TemplateNotFound {
            name: "nope".to_string(),
            referrer: None,
        }
    );
}

#[tokio::test]
async fn test_failure_in_chain_fails_whole_render() {
    let renderer = common::renderer_with(&[
        ("layouts/application", "Header {{yield}} Footer"),
        ("home", "Hello {{ require \"partials/nav\" }}"),
        ("partials/nav", "{{ require \"partials/missing\" }}"),
    ]);

    let err = renderer
        .execute("home", &json!({}), &RequestContext::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RenderError::TemplateNotFound {
            name: "partials/missing".to_string(),
            referrer: Some("partials/nav".to_string()),
        }
    );
    assert!(err.to_string().contains("referenced from \"partials/nav\""));
}

#[tokio::test]
async fn test_layout_sees_data_and_helpers() {
    let renderer = common::renderer_with(&[
        (
            "layouts/application",
            "<title>{{.Title}}</title><body>{{yield}}</body><p>{{ url \"about\" }}</p>",
        ),
        ("home", "{{.Title}}!"),
    ]);

    let html = renderer
        .execute("home", &json!({"Title": "Start"}), &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(
        html.as_str(),
        "<title>Start</title><body>Start!</body><p>/about</p>"
    );
}

#[tokio::test]
async fn test_render_is_idempotent_with_warm_cache() {
    let renderer = common::renderer_with(&[
        ("layouts/application", "Header {{yield}} Footer"),
        ("home", "Hello {{.Name}} {{ render \"partials/sig\" }}"),
        ("partials/sig", "-- {{.Name}}"),
    ]);
    let data = json!({"Name": "Ana"});
    let ctx = RequestContext::new();

    let first = renderer.execute("home", &data, &ctx).await.unwrap();
    let second = renderer.execute("home", &data, &ctx).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.as_str(), "Header Hello Ana -- Ana Footer");
}

#[tokio::test]
async fn test_custom_layout_prefix() {
    let settings = RenderSettings {
        layout_prefix: "shells".to_string(),
        default_layout: Some("main".to_string()),
        ..common::test_settings()
    };
    let store = MemoryAssetStore::new()
        .with("shells/main.tmpl", "<{{yield}}>")
        .with("home.tmpl", "hi");
    let renderer = Renderer::builder(settings)
        .asset_store(Arc::new(store))
        .build();

    let html = renderer
        .execute("home", &json!({}), &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(html.as_str(), "<hi>");
}

#[tokio::test]
async fn test_broken_layout_is_not_skipped() {
    let renderer = common::renderer_with(&[
        ("layouts/application", "Header {{ yield "),
        ("home", "Hello"),
    ]);

    let err = renderer
        .execute("home", &json!({}), &RequestContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::Compile { ref name, .. } if name == "layouts/application"));
}

//! End-to-end properties of the component, layout and callback layers.

use std::sync::Arc;

use glide_core::callback::{CallbackBridge, InvocationPolicy, Outcome, Output, Target, handler};
use glide_core::component::{ComponentInstance, Fields, ValidationError};
use glide_core::layout::{Container, Layout, LayoutError, Leaf};
use glide_core::registry::WidgetRegistry;
use glide_core::schema::{PropKind, PropertySpec, WidgetDefinition};
use serde_json::{Value, json};
use tokio::sync::oneshot;

fn fields(v: Value) -> Fields {
    match v {
        Value::Object(map) => map,
        _ => panic!("object expected"),
    }
}

/// `loop` (boolean, default false) and required `slides` whose elements
/// require `src`.
fn slider() -> Arc<WidgetDefinition> {
    let def = WidgetDefinition::builder("test", "Slider")
        .prop(PropertySpec::new("id", PropKind::String))
        .prop(PropertySpec::new("loop", PropKind::Bool).default_value(json!(false)))
        .prop(
            PropertySpec::new(
                "slides",
                PropKind::ListOf {
                    fields: vec![
                        PropertySpec::new("src", PropKind::String).required(),
                        PropertySpec::new("alt", PropKind::String),
                    ],
                },
            )
            .required(),
        )
        .prop(PropertySpec::new("activeIndex", PropKind::Number))
        .build()
        .unwrap();
    Arc::new(def)
}

#[test]
fn serialization_is_deterministic_for_every_builtin() {
    let registry = WidgetRegistry::with_builtins().unwrap();
    for def in registry.iter() {
        let supplied = fields(json!({
            "slides": [{ "src": "a.jpg", "alt": "A" }],
            "loop": true,
            "data-track": "hero",
        }));
        let a = ComponentInstance::create(def.clone(), supplied.clone(), Some("x".into())).unwrap();
        let b = ComponentInstance::create(def.clone(), supplied, Some("x".into())).unwrap();
        assert_eq!(
            serde_json::to_string(&a.serialize()).unwrap(),
            serde_json::to_string(&b.serialize()).unwrap(),
            "{}",
            def.type_name()
        );
    }
}

#[test]
fn unknown_fields_always_rejected() {
    for name in ["colour", "slide", "Loop", "data-"] {
        let err = ComponentInstance::create(slider(), fields(json!({ "slides": [], name: 1 })), None).unwrap_err();
        assert_eq!(err, ValidationError::UnknownField { widget: "Slider".into(), field: name.into() });
    }
}

#[test]
fn required_fields() {
    let err = ComponentInstance::create(slider(), fields(json!({ "loop": true })), None).unwrap_err();
    assert_eq!(err, ValidationError::MissingRequiredField { widget: "Slider".into(), field: "slides".into() });

    for slides in [json!([]), json!([{ "src": "a.jpg" }]), json!([{ "src": "a.jpg" }, { "src": "b.jpg", "alt": "B" }])] {
        ComponentInstance::create(slider(), fields(json!({ "slides": slides })), None).unwrap();
    }
}

#[test]
fn invalid_element_reported_with_index() {
    let err = ComponentInstance::create(
        slider(),
        fields(json!({ "slides": [{ "src": "a.jpg" }, { "alt": "no src" }, { "bogus": 1 }] })),
        None,
    )
    .unwrap_err();
    assert_eq!(err.path(), "slides[1].src");
    assert!(matches!(err.leaf(), ValidationError::MissingRequiredField { .. }));
}

#[test]
fn explicit_default_is_not_dropped() {
    let set = ComponentInstance::create(slider(), fields(json!({ "slides": [], "loop": false })), None).unwrap();
    let unset = ComponentInstance::create(slider(), fields(json!({ "slides": [] })), None).unwrap();
    assert_eq!(set.serialize().props.get("loop"), Some(&json!(false)));
    assert_eq!(unset.serialize().props.get("loop"), None);
    assert_ne!(set.serialize(), unset.serialize());
}

#[test]
fn duplicate_identifiers_fail_assembly() {
    let a = ComponentInstance::create(slider(), fields(json!({ "slides": [] })), Some("dup".into())).unwrap();
    let root = Container::new("div").child(a).child(Container::new("section").child(Leaf::new("p").id("dup")));
    assert_eq!(Layout::assemble(root).unwrap_err(), LayoutError::DuplicateIdentifier("dup".into()));
}

fn page() -> Arc<Layout> {
    let s = ComponentInstance::create(slider(), fields(json!({ "slides": [] })), Some("slider".into())).unwrap();
    let root = Container::new("div").child(s).child(Leaf::new("p").id("label").text("Slide 1"));
    Arc::new(Layout::assemble(root).unwrap())
}

fn source() -> Target {
    Target::new("slider", "activeIndex")
}

fn label() -> Target {
    Target::new("label", "text")
}

#[tokio::test]
async fn callback_round_trip() {
    let mut bridge = CallbackBridge::new(page(), InvocationPolicy::default());
    bridge
        .register(
            [source()],
            [label()],
            handler::from_fn1(|v| match v.as_u64() {
                Some(3) => Ok(Output::one("Slide 4")),
                _ => Ok(Output::NoUpdate),
            }),
        )
        .unwrap();

    let out = bridge.trigger(source(), json!(3)).await.unwrap();
    assert_eq!(out[0].1, Outcome::Applied(vec![(label(), json!("Slide 4"))]));
    assert_eq!(bridge.value(&label()), Some(json!("Slide 4")));

    let out = bridge.trigger(source(), json!(5)).await.unwrap();
    assert_eq!(out[0].1, Outcome::Suppressed);
    assert_eq!(bridge.value(&label()), Some(json!("Slide 4")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn late_stale_result_never_overwrites() {
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
    let (started_tx, started_rx) = oneshot::channel::<()>();
    let started_tx = Arc::new(std::sync::Mutex::new(Some(started_tx)));

    let mut bridge = CallbackBridge::new(page(), InvocationPolicy::LatestWins);
    bridge
        .register(
            [source()],
            [label()],
            handler::from_async1(move |v| {
                let (release_rx, started_tx) = (release_rx.clone(), started_tx.clone());
                async move {
                    if v == json!(0) {
                        if let Some(tx) = started_tx.lock().unwrap().take() {
                            let _ = tx.send(());
                        }
                        if let Some(rx) = release_rx.lock().await.take() {
                            let _ = rx.await;
                        }
                    }
                    Ok(Output::one(format!("input {v}")))
                }
            }),
        )
        .unwrap();
    let bridge = Arc::new(bridge);

    let first = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.trigger(source(), json!(0)).await }
    });
    started_rx.await.unwrap();

    let second = bridge.trigger(source(), json!(1)).await.unwrap();
    assert_eq!(second[0].1, Outcome::Applied(vec![(label(), json!("input 1"))]));

    release_tx.send(()).unwrap();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first[0].1, Outcome::Superseded);
    assert_eq!(bridge.value(&label()), Some(json!("input 1")));
}

#[tokio::test]
async fn independent_callbacks_do_not_block_each_other() {
    let s = ComponentInstance::create(slider(), fields(json!({ "slides": [] })), Some("slider".into())).unwrap();
    let root = Container::new("div")
        .child(s)
        .child(Leaf::new("p").id("slow"))
        .child(Leaf::new("p").id("fast"));
    let mut bridge = CallbackBridge::new(Arc::new(Layout::assemble(root).unwrap()), InvocationPolicy::Sequential);

    let (tx, rx) = oneshot::channel::<()>();
    let rx = Arc::new(tokio::sync::Mutex::new(Some(rx)));
    bridge
        .register(
            [source()],
            [Target::new("slow", "text")],
            handler::from_async1(move |v| {
                let rx = rx.clone();
                async move {
                    if let Some(rx) = rx.lock().await.take() {
                        let _ = rx.await;
                    }
                    Ok(Output::one(v))
                }
            }),
        )
        .unwrap();
    bridge
        .register([source()], [Target::new("fast", "text")], handler::from_fn1(|v| Ok(Output::one(v))))
        .unwrap();
    let bridge = Arc::new(bridge);

    let pending = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.trigger(source(), json!(7)).await }
    });
    // The fast callback completes while the slow one is still waiting.
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while bridge.value(&Target::new("fast", "text")).is_none() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(bridge.value(&Target::new("slow", "text")), None);

    tx.send(()).unwrap();
    let outcomes = pending.await.unwrap().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|(_, o)| matches!(o, Outcome::Applied(_))));
}

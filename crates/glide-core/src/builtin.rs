//! Static declarations for the built-in slider widgets and the catalogue
//! of transition shaders the client renderer ships with.

use crate::schema::{KindDecl, PropDecl, WidgetDecl};

pub const NAMESPACE: &str = "dash_swiper";

// ── Shared prop sets (referenced by multiple widgets) ─────────────────────

const fn prop(name: &'static str, kind: KindDecl, default: Option<&'static str>, doc: &'static str) -> PropDecl {
    PropDecl { name, kind, required: false, default, doc }
}

const AUTOPLAY_FIELDS: &[PropDecl] = &[
    prop("delay",                KindDecl::Number, None, "Delay between transitions (ms)."),
    prop("disableOnInteraction", KindDecl::Bool,   None, "Stop autoplay after the user swipes."),
];

const NAVIGATION_FIELDS: &[PropDecl] = &[
    prop("nextEl", KindDecl::String, None, "Selector of the \"next\" button element."),
    prop("prevEl", KindDecl::String, None, "Selector of the \"previous\" button element."),
];

const PAGINATION_FIELDS: &[PropDecl] = &[
    prop("clickable", KindDecl::Bool,   None, "Whether pagination bullets switch slides on click."),
    prop("el",        KindDecl::String, None, "Selector of the pagination container."),
];

const SWIPER_SLIDE_FIELDS: &[PropDecl] = &[
    prop("alt",   KindDecl::String, None, "Image alt text."),
    prop("link",  KindDecl::String, None, "URL opened when the slide is clicked."),
    PropDecl { name: "src", kind: KindDecl::String, required: true, default: None, doc: "Image URL (resolve asset names first)." },
    prop("title", KindDecl::String, None, "Caption shown over the slide."),
];

const CAROUSEL_SLIDE_FIELDS: &[PropDecl] = &[
    PropDecl { name: "src", kind: KindDecl::String, required: true, default: None, doc: "Image URL." },
    prop("alt",         KindDecl::String, None, "Image alt text; also reported as `activeSlideAlt`."),
    prop("title",       KindDecl::String, None, "Slide title."),
    prop("description", KindDecl::String, None, "Slide description."),
];

const CAROUSEL_EFFECT_FIELDS: &[PropDecl] = &[
    prop("opacityStep", KindDecl::Number, None, "Opacity change between neighbouring slides."),
    prop("scaleStep",   KindDecl::Number, None, "Scale change between neighbouring slides."),
    prop("sideSlides",  KindDecl::Number, None, "Number of visible side slides."),
];

const ID_PROP: PropDecl = prop("id", KindDecl::String, None, "Identifier used to address this component from callbacks.");
const CLASS_PROP: PropDecl = prop("className", KindDecl::String, None, "Extra CSS class for the root element.");
const OPTIONS_PROP: PropDecl = prop(
    "swiperOptions", KindDecl::Dict, Some("{}"),
    "Options forwarded verbatim to the slider library.",
);

const WILDCARDS: &[&str] = &["data-", "aria-"];

// ── Widget declarations ───────────────────────────────────────────────────

pub static SWIPER: WidgetDecl = WidgetDecl {
    namespace: NAMESPACE,
    name: "DashSwiper",
    version: "0.0.1",
    doc: "Image slider with WebGL transition effects.\n\nEach slide is an image with optional caption and link.",
    wildcard_prefixes: WILDCARDS,
    props: &[
        ID_PROP,
        prop("autoplay", KindDecl::Shape(AUTOPLAY_FIELDS),
             Some(r#"{"delay": 2500, "disableOnInteraction": false}"#),
             "Autoplay timing. Autoplay pauses while the pointer is over the slider."),
        CLASS_PROP,
        prop("loop", KindDecl::Bool, Some("false"), "Continuous loop mode."),
        prop("navigation", KindDecl::Shape(NAVIGATION_FIELDS),
             Some(r#"{"prevEl": ".swiper-button-prev", "nextEl": ".swiper-button-next"}"#),
             "Navigation button selectors."),
        prop("nextButton", KindDecl::Bool, Some("true"), "Render the \"next\" button."),
        prop("pagination", KindDecl::Shape(PAGINATION_FIELDS),
             Some(r#"{"el": ".swiper-pagination", "clickable": true}"#),
             "Pagination bullets."),
        prop("prevButton", KindDecl::Bool, Some("true"), "Render the \"previous\" button."),
        prop("shader", KindDecl::Any, Some(r#""random""#),
             "Transition effect name, or a list of names. Forwarded to the renderer uninterpreted."),
        prop("slides", KindDecl::ListOf(SWIPER_SLIDE_FIELDS), Some("[]"), "Slides, in display order."),
        prop("speed", KindDecl::Number, Some("1000"), "Transition duration (ms)."),
        OPTIONS_PROP,
        prop("activeIndex", KindDecl::Number, None, "Index of the visible slide. Written by the renderer."),
    ],
};

pub static CAROUSEL: WidgetDecl = WidgetDecl {
    namespace: NAMESPACE,
    name: "DashCarousel",
    version: "0.0.1",
    doc: "Centered 3D carousel.\n\nReports the visible slide through `activeIndex` and `activeSlideAlt`.",
    wildcard_prefixes: WILDCARDS,
    props: &[
        ID_PROP,
        PropDecl {
            name: "slides", kind: KindDecl::ListOf(CAROUSEL_SLIDE_FIELDS), required: true, default: None,
            doc: "Slides, in display order.",
        },
        prop("className", KindDecl::String, Some(r#""""#), "Extra CSS class for the root element."),
        prop("carouselEffect", KindDecl::Shape(CAROUSEL_EFFECT_FIELDS),
             Some(r#"{"opacityStep": 0.33, "scaleStep": 0.2, "sideSlides": 2}"#),
             "Carousel effect tuning."),
        prop("navigation", KindDecl::Bool, Some("true"), "Display navigation buttons."),
        prop("pagination", KindDecl::Bool, Some("true"), "Display pagination dots."),
        prop("autoplayEnabled", KindDecl::Bool, Some("false"), "Enable autoplay."),
        prop("autoplay", KindDecl::Shape(AUTOPLAY_FIELDS),
             Some(r#"{"delay": 3000, "disableOnInteraction": false}"#),
             "Autoplay timing, used when `autoplayEnabled` is set."),
        prop("loop", KindDecl::Bool, Some("true"), "Continuous loop mode."),
        prop("grabCursor", KindDecl::Bool, Some("true"), "Show a grab cursor while swiping."),
        prop("slidesPerView", KindDecl::Number, Some("3"), "Number of slides per view."),
        OPTIONS_PROP,
        prop("activeIndex", KindDecl::Number, Some("0"), "Index of the visible slide. Written by the renderer."),
        prop("activeSlideAlt", KindDecl::String, Some(r#""""#), "Alt text of the visible slide. Written by the renderer."),
        prop("style", KindDecl::Dict, Some("{}"), "Inline styles for the carousel container."),
    ],
};

pub static WIDGETS: &[&WidgetDecl] = &[&SWIPER, &CAROUSEL];

// ── Shaders ───────────────────────────────────────────────────────────────

/// Transition effects known to the bundled renderer. `random` picks one per
/// transition. Tooling only: the `shader` field is never validated against it.
pub static SHADERS: &[&str] = &[
    "random",
    "dots", "flyeye", "morph-x", "morph-y", "page-curl", "peel-x", "peel-y",
    "pixelize", "polygons-fall", "polygons-morph", "polygons-wind", "ripple",
    "shutters", "slices", "squares", "stretch", "wave-x", "wind",
];

pub fn is_known_shader(name: &str) -> bool {
    SHADERS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::WidgetDefinition;

    #[test]
    fn builtin_tables_are_well_formed() {
        for decl in WIDGETS {
            WidgetDefinition::from_decl(decl).unwrap();
        }
    }

    #[test]
    fn swiper_defaults_match_renderer() {
        let def = WidgetDefinition::from_decl(&SWIPER).unwrap();
        assert_eq!(def.default_of("speed"), Some(&serde_json::json!(1000)));
        assert_eq!(def.default_of("shader"), Some(&serde_json::json!("random")));
        assert_eq!(def.default_of("nextButton"), Some(&serde_json::json!(true)));
        assert!(!def.is_required("slides"));
    }

    #[test]
    fn carousel_requires_slides() {
        let def = WidgetDefinition::from_decl(&CAROUSEL).unwrap();
        assert!(def.is_required("slides"));
        assert!(def.accepts("data-testid"));
    }

    #[test]
    fn shader_catalogue() {
        assert!(is_known_shader("page-curl"));
        assert!(!is_known_shader("sparkles"));
    }
}

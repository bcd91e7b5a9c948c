//! Component Adapter Module
//!
//! Thin adapter memoizing a UI-component-like render function: calls are
//! keyed by the rendered [`Element`] using the single-element comparator
//! (identity fields plus a shallow property diff), and the wrapper carries
//! the decorated fields a component host expects. The core engine stays
//! agnostic of all of this.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheEngine, CacheSnapshot, CachedValue, StatsSnapshot};
use crate::error::Result;
use crate::key::{Arg, Element, KeyComparator};
use crate::options::Options;

// == Memoize Component ==
/// Wraps a render function in a memoizing cache keyed by element identity.
///
/// `name` feeds the decorated `display_name` (`Memoized(<name>)`).
pub fn memoize_component<V, F>(
    name: &str,
    render: F,
    options: Options<V>,
) -> Result<MemoizedComponent<V>>
where
    V: Clone + Send + Sync + 'static,
    F: Fn(&Element) -> V + Send + Sync + 'static,
{
    options.validate()?;
    Ok(MemoizedComponent {
        engine: CacheEngine::with_comparator(options, KeyComparator::SingleElement),
        render: Arc::new(render),
        display_name: format!("Memoized({name})"),
        default_props: None,
    })
}

// == Memoized Component ==
/// A memoized render function decorated with component fields.
pub struct MemoizedComponent<V> {
    engine: CacheEngine<V>,
    render: Arc<dyn Fn(&Element) -> V + Send + Sync>,
    display_name: String,
    default_props: Option<Arc<BTreeMap<String, Arg>>>,
}

impl<V: Clone + Send + Sync + 'static> MemoizedComponent<V> {
    // == Render ==
    /// Renders `element` through the cache: an element matching a cached
    /// one by kind, identity, and shallow property diff is answered from
    /// cache without re-rendering.
    pub fn render(&self, element: Element) -> V {
        let element = Arc::new(element);
        let key = vec![Arg::Element(Arc::clone(&element))];

        if let Some(CachedValue::Ready(value)) = self.engine.get_key(&key) {
            return value;
        }

        let value = (self.render)(&element);
        self.engine.insert_ready(key, value.clone());
        value
    }

    // == Decorated Fields ==
    /// Returns the decorated display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the forwarded default props, if any were attached.
    pub fn default_props(&self) -> Option<&BTreeMap<String, Arg>> {
        self.default_props.as_deref()
    }

    /// Attaches forwarded default props.
    pub fn with_default_props(
        mut self,
        props: impl IntoIterator<Item = (String, Arg)>,
    ) -> Self {
        self.default_props = Some(Arc::new(props.into_iter().collect()));
        self
    }

    // == Cache API ==
    /// Empties the render cache.
    pub fn clear(&self) {
        self.engine.clear()
    }

    /// Returns true when a matching element is cached.
    pub fn has(&self, element: &Element) -> bool {
        self.engine.has(&[Arg::element(element.clone())])
    }

    /// Removes the cached result for a matching element.
    pub fn remove(&self, element: &Element) -> bool {
        self.engine.remove(&[Arg::element(element.clone())])
    }

    /// Returns a point-in-time copy of the render cache.
    pub fn cache_snapshot(&self) -> CacheSnapshot<V> {
        self.engine.snapshot()
    }

    /// Returns the counters recorded for this component's stats profile.
    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats()
    }

    /// Marker distinguishing memoized wrappers from plain functions.
    pub fn is_memoized(&self) -> bool {
        true
    }
}

impl<V> Clone for MemoizedComponent<V> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            render: Arc::clone(&self.render),
            display_name: self.display_name.clone(),
            default_props: self.default_props.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> fmt::Debug for MemoizedComponent<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedComponent")
            .field("display_name", &self.display_name)
            .field("size", &self.engine.len())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_renderer(renders: &Arc<AtomicUsize>) -> MemoizedComponent<String> {
        let renders = Arc::clone(renders);
        memoize_component(
            "Row",
            move |element: &Element| {
                renders.fetch_add(1, Ordering::SeqCst);
                format!("<{}>", element.kind)
            },
            Options::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_display_name_decoration() {
        let renders = Arc::new(AtomicUsize::new(0));
        let component = counting_renderer(&renders);

        assert_eq!(component.display_name(), "Memoized(Row)");
        assert!(component.is_memoized());
    }

    #[test]
    fn test_render_cached_by_element_identity() {
        let renders = Arc::new(AtomicUsize::new(0));
        let component = counting_renderer(&renders);

        let element = Element::new("row").with_id("7").with_prop("label", "x");

        assert_eq!(component.render(element.clone()), "<row>");
        assert_eq!(component.render(element), "<row>");
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_changed_prop_re_renders() {
        let renders = Arc::new(AtomicUsize::new(0));
        let component = counting_renderer(&renders);

        component.render(Element::new("row").with_id("7").with_prop("label", "x"));
        component.render(Element::new("row").with_id("7").with_prop("label", "y"));

        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_and_has() {
        let renders = Arc::new(AtomicUsize::new(0));
        let component = counting_renderer(&renders);

        let element = Element::new("row").with_id("7");
        component.render(element.clone());

        assert!(component.has(&element));
        assert!(component.remove(&element));
        assert!(!component.has(&element));
    }

    #[test]
    fn test_default_props_forwarded() {
        let renders = Arc::new(AtomicUsize::new(0));
        let component = counting_renderer(&renders)
            .with_default_props([("label".to_string(), Arg::from("fallback"))]);

        let props = component.default_props().unwrap();
        assert!(matches!(props.get("label"), Some(Arg::Str(_))));
    }
}

//! Widget kinds known to a renderer.

use std::collections::{BTreeSet, HashMap};

/// What a renderer knows about one widget kind.
#[derive(Debug, Clone, Default)]
pub struct KindSpec {
    /// Property keys this kind understands. `None` accepts any key.
    pub props: Option<BTreeSet<String>>,
    /// Whether nodes of this kind may hold children.
    pub container: bool,
}

impl KindSpec {
    pub fn leaf() -> KindSpec {
        KindSpec::default()
    }

    pub fn container() -> KindSpec {
        KindSpec {
            props: None,
            container: true,
        }
    }

    pub fn with_props<I, S>(mut self, props: I) -> KindSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.props = Some(props.into_iter().map(Into::into).collect());
        self
    }

    pub fn accepts_prop(&self, key: &str) -> bool {
        self.props.as_ref().map_or(true, |props| props.contains(key))
    }
}

/// Result of looking up a type tag.
#[derive(Debug, Clone, Copy)]
pub enum Kind<'a> {
    Known(&'a KindSpec),
    /// The tag is not registered; the renderer shows a placeholder and accepts any properties.
    Placeholder,
}

impl Kind<'_> {
    pub fn accepts_prop(&self, key: &str) -> bool {
        match self {
            Kind::Known(spec) => spec.accepts_prop(key),
            Kind::Placeholder => true,
        }
    }

    /// Whether nodes of this kind may receive inserted children. Placeholders accept anything.
    pub fn is_container(&self) -> bool {
        match self {
            Kind::Known(spec) => spec.container,
            Kind::Placeholder => true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Kind::Placeholder)
    }
}

/// Maps type tags to [`KindSpec`]s.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<String, KindSpec>,
}

impl KindRegistry {
    pub fn new() -> KindRegistry {
        KindRegistry::default()
    }

    pub fn register(&mut self, tag: impl Into<String>, spec: KindSpec) -> &mut Self {
        self.kinds.insert(tag.into(), spec);
        self
    }

    pub fn resolve(&self, tag: &str) -> Kind<'_> {
        match self.kinds.get(tag) {
            Some(spec) => Kind::Known(spec),
            None => Kind::Placeholder,
        }
    }
}

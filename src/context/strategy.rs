//! Per-type algorithm selection.
//!
//! Layout and virtual-method algorithms are opaque to this crate; it only decides which one
//! applies to a type.

use std::{fmt, sync::Arc};

/// Broad kind of a type, as far as algorithm selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// Reference type
    Class,
    /// Value type
    ValueType,
    /// Interface
    Interface,
    /// Delegate, a class deriving from `System.MulticastDelegate`
    Delegate,
    /// Enumeration
    Enum,
}

/// Computes field layout.
pub trait FieldLayoutAlgorithm: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;
}

/// Computes virtual method slots.
pub trait VirtualMethodAlgorithm: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;
}

/// Enumerates the virtual methods of a type.
pub trait VirtualMethodEnumerationAlgorithm: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;
}

/// Field layout driven by metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataFieldLayout;

impl FieldLayoutAlgorithm for MetadataFieldLayout {
    fn name(&self) -> &str {
        "metadata-field-layout"
    }
}

/// Virtual method slots driven by metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataVirtualMethods;

impl VirtualMethodAlgorithm for MetadataVirtualMethods {
    fn name(&self) -> &str {
        "metadata-virtual-methods"
    }
}

/// Enumerates virtual methods as declared in metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataMethodEnumeration;

impl VirtualMethodEnumerationAlgorithm for MetadataMethodEnumeration {
    fn name(&self) -> &str {
        "metadata-method-enumeration"
    }
}

/// Enumerates delegate methods, including the runtime-provided `Invoke`, `BeginInvoke` and
/// `EndInvoke`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelegateMethodEnumeration;

impl VirtualMethodEnumerationAlgorithm for DelegateMethodEnumeration {
    fn name(&self) -> &str {
        "delegate-method-enumeration"
    }
}

/// The algorithms of a context.
#[derive(Clone)]
pub struct StrategySet {
    field_layout: Arc<dyn FieldLayoutAlgorithm>,
    virtual_methods: Arc<dyn VirtualMethodAlgorithm>,
    method_enumeration: Arc<dyn VirtualMethodEnumerationAlgorithm>,
    delegate_enumeration: Arc<dyn VirtualMethodEnumerationAlgorithm>,
}

impl StrategySet {
    /// Creates a strategy set from its algorithms.
    #[must_use]
    pub fn new(
        field_layout: Arc<dyn FieldLayoutAlgorithm>,
        virtual_methods: Arc<dyn VirtualMethodAlgorithm>,
        method_enumeration: Arc<dyn VirtualMethodEnumerationAlgorithm>,
        delegate_enumeration: Arc<dyn VirtualMethodEnumerationAlgorithm>,
    ) -> Self {
        StrategySet {
            field_layout,
            virtual_methods,
            method_enumeration,
            delegate_enumeration,
        }
    }

    /// Field layout algorithm; the same for every category.
    #[must_use]
    pub fn field_layout(&self, _category: TypeCategory) -> Arc<dyn FieldLayoutAlgorithm> {
        Arc::clone(&self.field_layout)
    }

    /// Virtual slot algorithm; the same for every category.
    #[must_use]
    pub fn virtual_methods(&self, _category: TypeCategory) -> Arc<dyn VirtualMethodAlgorithm> {
        Arc::clone(&self.virtual_methods)
    }

    /// Method enumeration algorithm; delegates get their own.
    #[must_use]
    pub fn method_enumeration(
        &self,
        category: TypeCategory,
    ) -> Arc<dyn VirtualMethodEnumerationAlgorithm> {
        match category {
            TypeCategory::Delegate => Arc::clone(&self.delegate_enumeration),
            _ => Arc::clone(&self.method_enumeration),
        }
    }
}

impl Default for StrategySet {
    fn default() -> Self {
        StrategySet::new(
            Arc::new(MetadataFieldLayout),
            Arc::new(MetadataVirtualMethods),
            Arc::new(MetadataMethodEnumeration),
            Arc::new(DelegateMethodEnumeration),
        )
    }
}

impl fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategySet")
            .field("field_layout", &self.field_layout.name())
            .field("virtual_methods", &self.virtual_methods.name())
            .field("method_enumeration", &self.method_enumeration.name())
            .field("delegate_enumeration", &self.delegate_enumeration.name())
            .finish()
    }
}

// id.rs: Stable identifiers for analysis artifacts
//
// All ids are dense indices allocated in declaration order, so two runs over
// identical input assign identical ids. That is what makes plan output
// reproducible byte-for-byte.

/// Canonical type (index into `TypeTable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Receiver operation (index into `OperationCatalog`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u32);

/// Logical field (index into `DependencyIndex`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

/// Cached comparison (index into `DispatchPlan::shared_comparisons`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComparisonId(pub u32);

impl OperationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FieldId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ComparisonId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

use practicum_core::{Entity, OperationId, OperationKind};

/// The speculative change a mutation makes before the server answers.
#[derive(Clone, Debug)]
pub enum Optimistic<T: Entity> {
    Patch(T::Patch),
    Remove,
    /// New entity, usually under a client-generated temporary id.
    Insert(T),
}

#[derive(Clone, Debug)]
pub struct MutationIntent<T: Entity> {
    pub operation_id: OperationId,
    pub operation: OperationKind,
    pub target_id: T::Id,
    pub optimistic: Optimistic<T>,
}

impl<T: Entity> MutationIntent<T> {
    pub fn patch(operation: OperationKind, target_id: T::Id, patch: T::Patch) -> Self {
        Self { operation_id: OperationId::new(), operation, target_id, optimistic: Optimistic::Patch(patch) }
    }

    pub fn remove(operation: OperationKind, target_id: T::Id) -> Self {
        Self { operation_id: OperationId::new(), operation, target_id, optimistic: Optimistic::Remove }
    }

    pub fn insert(operation: OperationKind, item: T) -> Self {
        Self { operation_id: OperationId::new(), operation, target_id: item.id().clone(), optimistic: Optimistic::Insert(item) }
    }
}

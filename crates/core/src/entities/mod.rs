//! Settings entity tree.
//!
//! A tree of typed nodes built from a resolved schema. Every node holds up
//! to three value layers (defaults, studio overrides, project overrides) and
//! resolves its current value from the layer selected by the tree's
//! [`OverrideState`].
//!
//! Nodes live in an arena owned by [`EntityTree`] and are addressed by
//! [`EntityId`]. Each node keeps a handle to its parent; a change walks up
//! through those handles and finally runs the callbacks registered on the
//! tree. Mutable dict and list children are rebuilt on every override state
//! change, so ids of dynamic items do not survive
//! [`EntityTree::set_override_state`].

mod build;
mod check;
mod dict_fixed;
mod dict_mutable;
mod input;
mod list;
mod list_strict;
pub mod root;

use std::rc::Rc;

use serde_json::Value;

pub use build::LayoutItem;
pub use input::InputKind;
pub use root::{ProjectSettings, SettingsRoot, SystemSettings};

use crate::error::SettingsError;
use crate::override_state::OverrideState;
use crate::types::Document;
use build::SchemaNode;
use dict_fixed::DictFixedEntity;
use dict_mutable::DictMutableEntity;
use input::InputEntity;
use list::ListEntity;
use list_strict::ListStrictEntity;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Handle of an entity inside an [`EntityTree`].
///
/// Handles are generation checked: a handle of a removed entity is never
/// silently reused for a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

/// Public kind of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Boolean,
    Number,
    Text,
    Enum,
    PathInput,
    RawJson,
    Dict,
    DictModifiable,
    List,
    ListStrict,
}

/// Value layer a stored document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layer {
    Default,
    Studio,
    Project,
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Override presence flags shared by every entity kind.
///
/// `had_*` record whether the layer had a value when it was loaded, `has_*`
/// whether the entity currently has an override in that layer.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OverrideFlags {
    pub(crate) has_default_value: bool,
    pub(crate) has_studio_override: bool,
    pub(crate) had_studio_override: bool,
    pub(crate) has_project_override: bool,
    pub(crate) had_project_override: bool,
}

impl OverrideFlags {
    /// Mark an override in the layer of `state`.
    pub(crate) fn mark(&mut self, state: OverrideState) {
        match state {
            OverrideState::Studio => self.has_studio_override = true,
            OverrideState::Project => self.has_project_override = true,
            _ => {}
        }
    }

    /// Take the loaded presence of the layers `state` resolves through.
    pub(crate) fn enter(&mut self, state: OverrideState) {
        match state {
            OverrideState::Studio => self.has_studio_override = self.had_studio_override,
            OverrideState::Project => {
                self.has_project_override = self.had_project_override;
                self.has_studio_override = self.had_studio_override;
            }
            _ => {}
        }
    }

    pub(crate) fn restore(&mut self) {
        self.has_studio_override = self.had_studio_override;
        self.has_project_override = self.had_project_override;
    }

    pub(crate) fn set_loaded(&mut self, layer: Layer, loaded: bool) {
        match layer {
            Layer::Default => self.has_default_value = loaded,
            Layer::Studio => self.had_studio_override = loaded,
            Layer::Project => self.had_project_override = loaded,
        }
    }

    /// Changes of override presence, and layers with nothing beneath them.
    pub(crate) fn unsaved(&self, state: OverrideState) -> bool {
        match state {
            OverrideState::NotDefined => false,
            OverrideState::Defaults => !self.has_default_value,
            OverrideState::Studio => {
                self.has_studio_override != self.had_studio_override
                    || (!self.has_studio_override && !self.has_default_value)
            }
            OverrideState::Project => {
                self.has_project_override != self.had_project_override
                    || (!self.has_project_override
                        && !self.has_studio_override
                        && !self.has_default_value)
            }
        }
    }
}

pub(crate) struct Node {
    pub(crate) schema: Rc<SchemaNode>,
    pub(crate) parent: Option<EntityId>,
    pub(crate) key: Option<String>,
    pub(crate) is_group: bool,
    pub(crate) group_item: Option<EntityId>,
    pub(crate) file_item: Option<EntityId>,
    pub(crate) is_dynamic_item: bool,
    pub(crate) is_in_dynamic_item: bool,
    pub(crate) env_group_key: Option<String>,
    pub(crate) state: OverrideState,
    pub(crate) flags: OverrideFlags,
    pub(crate) ignore_child_changes: bool,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn is_dynamic(&self) -> bool {
        self.is_dynamic_item || self.is_in_dynamic_item
    }
}

pub(crate) enum NodeKind {
    Input(InputEntity),
    DictFixed(DictFixedEntity),
    DictMutable(DictMutableEntity),
    List(ListEntity),
    ListStrict(ListStrictEntity),
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Arena of settings entities with a single root dict.
pub struct EntityTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: EntityId,
    state: OverrideState,
    callbacks: Vec<Box<dyn FnMut()>>,
}

impl std::fmt::Debug for EntityTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTree")
            .field("entities", &(self.slots.len() - self.free.len()))
            .field("state", &self.state)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl EntityTree {
    /// Build a tree from a resolved root schema (an object with `children`).
    ///
    /// All schema validations run here; a tree that builds never fails on
    /// schema problems later.
    pub fn from_schema(schema: &Value) -> Result<Self, SettingsError> {
        let root_schema = build::parse_root(schema)?;
        let mut tree = EntityTree {
            slots: Vec::new(),
            free: Vec::new(),
            root: EntityId {
                index: 0,
                generation: 0,
            },
            state: OverrideState::NotDefined,
            callbacks: Vec::new(),
        };
        tree.root = tree.instantiate(&root_schema, None, None, false);
        tree.validate()?;
        Ok(tree)
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Override state of the whole tree.
    pub fn override_state(&self) -> OverrideState {
        self.state
    }

    /// Whether `id` still refers to an entity of this tree.
    pub fn contains(&self, id: EntityId) -> bool {
        matches!(
            self.slots.get(id.index as usize),
            Some(Slot { generation, node: Some(_) }) if *generation == id.generation
        )
    }

    // -- Arena --

    /// # Panics
    ///
    /// Panics if `id` does not refer to a live entity of this tree.
    pub(crate) fn node(&self, id: EntityId) -> &Node {
        match self.slots.get(id.index as usize) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation => node,
            _ => panic!("BUG: entity {id:?} is not part of this tree"),
        }
    }

    pub(crate) fn node_mut(&mut self, id: EntityId) -> &mut Node {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation => node,
            _ => panic!("BUG: entity {id:?} is not part of this tree"),
        }
    }

    pub(crate) fn alloc(&mut self, node: Node) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return EntityId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).expect("BUG: entity arena overflow");
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        EntityId {
            index,
            generation: 0,
        }
    }

    /// Remove `id` and all of its descendants from the arena.
    pub(crate) fn free_subtree(&mut self, id: EntityId) {
        for child in self.child_ids(id) {
            self.free_subtree(child);
        }
        let slot = &mut self.slots[id.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }

    /// Direct children holding values, in order.
    pub(crate) fn child_ids(&self, id: EntityId) -> Vec<EntityId> {
        match &self.node(id).kind {
            NodeKind::Input(_) => Vec::new(),
            NodeKind::DictFixed(dict) => dict.children.clone(),
            NodeKind::DictMutable(dict) => dict.children.iter().map(|(_, child)| *child).collect(),
            NodeKind::List(list) => list.children.clone(),
            NodeKind::ListStrict(list) => list.children.clone(),
        }
    }

    // -- Introspection --

    pub fn entity_type(&self, id: EntityId) -> EntityType {
        match &self.node(id).kind {
            NodeKind::Input(input) => input.kind.entity_type(),
            NodeKind::DictFixed(_) => EntityType::Dict,
            NodeKind::DictMutable(_) => EntityType::DictModifiable,
            NodeKind::List(_) => EntityType::List,
            NodeKind::ListStrict(_) => EntityType::ListStrict,
        }
    }

    pub fn key(&self, id: EntityId) -> Option<&str> {
        self.node(id).key.as_deref()
    }

    pub fn label(&self, id: EntityId) -> Option<&str> {
        self.node(id).schema.label.as_deref()
    }

    /// Schema data the entity was built from.
    pub fn schema_data(&self, id: EntityId) -> &Document {
        &self.node(id).schema.data
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.node(id).parent
    }

    pub fn is_group(&self, id: EntityId) -> bool {
        self.node(id).is_group
    }

    pub fn is_file(&self, id: EntityId) -> bool {
        self.node(id).schema.is_file
    }

    pub fn is_dynamic_item(&self, id: EntityId) -> bool {
        self.node(id).is_dynamic_item
    }

    pub fn is_in_dynamic_item(&self, id: EntityId) -> bool {
        self.node(id).is_in_dynamic_item
    }

    pub fn env_group_key(&self, id: EntityId) -> Option<&str> {
        self.node(id).env_group_key.as_deref()
    }

    /// Slash separated path from the root, list items addressed by index.
    pub fn path(&self, id: EntityId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            segments.push(self.child_segment(parent, current));
            current = parent;
        }
        segments.reverse();
        segments.join("/")
    }

    fn child_segment(&self, parent: EntityId, child: EntityId) -> String {
        if let Some(key) = &self.node(child).key {
            return key.clone();
        }
        self.child_ids(parent)
            .iter()
            .position(|id| *id == child)
            .map(|idx| idx.to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Children of a container, in value order.
    pub fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.child_ids(id)
    }

    /// Child of a dict by key, or of a list by decimal index.
    pub fn child(&self, id: EntityId, key: &str) -> Option<EntityId> {
        match &self.node(id).kind {
            NodeKind::Input(_) => None,
            NodeKind::DictFixed(dict) => dict
                .children
                .iter()
                .copied()
                .find(|child| self.node(*child).key.as_deref() == Some(key)),
            NodeKind::DictMutable(dict) => dict
                .children
                .iter()
                .find(|(child_key, _)| child_key == key)
                .map(|(_, child)| *child),
            NodeKind::List(_) | NodeKind::ListStrict(_) => {
                let index: usize = key.parse().ok()?;
                self.child_ids(id).get(index).copied()
            }
        }
    }

    /// Resolve a slash separated path such as `general/studio_name`.
    pub fn entity_by_path(&self, path: &str) -> Result<EntityId, SettingsError> {
        let mut current = self.root;
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            current = self
                .child(current, segment)
                .ok_or_else(|| SettingsError::KeyNotFound {
                    path: self.path(current),
                    key: segment.to_string(),
                })?;
        }
        Ok(current)
    }

    /// GUI layout of a dict, including labels and wrappers.
    pub fn gui_layout(&self, id: EntityId) -> &[LayoutItem] {
        self.node(id).schema.layout()
    }

    // -- Value access --

    /// Current value of the entity, metadata excluded.
    pub fn value(&self, id: EntityId) -> Value {
        match &self.node(id).kind {
            NodeKind::Input(input) => input.current.clone(),
            NodeKind::DictFixed(dict) => Value::Object(
                dict.children
                    .iter()
                    .map(|child| (self.node(*child).key.clone().unwrap_or_default(), self.value(*child)))
                    .collect(),
            ),
            NodeKind::DictMutable(dict) => Value::Object(
                dict.children
                    .iter()
                    .map(|(key, child)| (key.clone(), self.value(*child)))
                    .collect(),
            ),
            NodeKind::List(list) => {
                Value::Array(list.children.iter().map(|child| self.value(*child)).collect())
            }
            NodeKind::ListStrict(list) => {
                Value::Array(list.children.iter().map(|child| self.value(*child)).collect())
            }
        }
    }

    /// Value to store for the active layer, `None` when there is nothing to
    /// store.
    pub fn settings_value(&self, id: EntityId) -> Option<Value> {
        if self.node(id).state == OverrideState::NotDefined {
            return None;
        }
        match &self.node(id).kind {
            NodeKind::Input(_) => self.input_settings_value(id),
            NodeKind::DictFixed(_) => self.dict_settings_value(id),
            NodeKind::DictMutable(_) => self.mutable_settings_value(id),
            NodeKind::List(_) => self.list_settings_value(id),
            NodeKind::ListStrict(_) => self.strict_settings_value(id),
        }
    }

    /// Returns `true` if the group rule hides the entity at the active layer.
    pub(crate) fn group_without_override(&self, id: EntityId) -> bool {
        let node = self.node(id);
        if !node.is_group {
            return false;
        }
        match node.state {
            OverrideState::Studio => !self.has_studio_override(id),
            OverrideState::Project => !self.has_project_override(id),
            _ => false,
        }
    }

    /// Set a new value. Fires change notifications.
    pub fn set(&mut self, id: EntityId, value: Value) -> Result<(), SettingsError> {
        match &self.node(id).kind {
            NodeKind::Input(_) => self.input_set(id, value),
            NodeKind::DictFixed(_) => self.dict_set(id, value),
            NodeKind::DictMutable(_) => self.mutable_set(id, value),
            NodeKind::List(_) => self.list_set(id, value),
            NodeKind::ListStrict(_) => self.strict_set(id, value),
        }
    }

    /// Empty a list, or drop every key of a mutable dict that is not
    /// required. Other entity types can't be cleared.
    pub fn clear(&mut self, id: EntityId) -> Result<(), SettingsError> {
        match &self.node(id).kind {
            NodeKind::List(_) => self.list_clear(id),
            NodeKind::DictMutable(_) => self.mutable_clear(id),
            _ => {
                return Err(SettingsError::UnsupportedOperation {
                    path: self.path(id),
                    operation: "clear",
                    entity_type: format!("{:?}", self.entity_type(id)),
                })
            }
        }
        Ok(())
    }

    // -- Override flags --

    pub fn has_default_value(&self, id: EntityId) -> bool {
        self.node(id).flags.has_default_value
    }

    pub fn had_studio_override(&self, id: EntityId) -> bool {
        self.node(id).flags.had_studio_override
    }

    pub fn had_project_override(&self, id: EntityId) -> bool {
        self.node(id).flags.had_project_override
    }

    /// Entity or any of its children has a studio override.
    pub fn has_studio_override(&self, id: EntityId) -> bool {
        let node = self.node(id);
        if node.state < OverrideState::Studio {
            return false;
        }
        match &node.kind {
            NodeKind::Input(_) => node.flags.has_studio_override,
            NodeKind::DictFixed(dict) => dict
                .children
                .iter()
                .any(|child| self.has_studio_override(*child)),
            _ => {
                node.flags.has_studio_override
                    || self
                        .child_ids(id)
                        .into_iter()
                        .any(|child| self.has_studio_override(child))
            }
        }
    }

    /// Entity or any of its children has a project override.
    pub fn has_project_override(&self, id: EntityId) -> bool {
        let node = self.node(id);
        if node.state < OverrideState::Project {
            return false;
        }
        match &node.kind {
            NodeKind::Input(_) => node.flags.has_project_override,
            NodeKind::DictFixed(dict) => dict
                .children
                .iter()
                .any(|child| self.has_project_override(*child)),
            _ => {
                node.flags.has_project_override
                    || self
                        .child_ids(id)
                        .into_iter()
                        .any(|child| self.has_project_override(child))
            }
        }
    }

    /// Whether the entity is overridden in the active layer.
    pub fn is_overridden(&self, id: EntityId) -> bool {
        match self.node(id).state {
            OverrideState::Studio => self.has_studio_override(id),
            OverrideState::Project => self.has_project_override(id),
            _ => false,
        }
    }

    pub fn has_unsaved_changes(&self, id: EntityId) -> bool {
        match &self.node(id).kind {
            NodeKind::Input(_) => self.input_has_unsaved_changes(id),
            NodeKind::DictFixed(_) => self.dict_has_unsaved_changes(id),
            NodeKind::DictMutable(_) | NodeKind::List(_) | NodeKind::ListStrict(_) => {
                self.container_has_unsaved_changes(id)
            }
        }
    }

    /// Shared rule of dynamic containers: flag flips, modified children or a
    /// different serialized value than when the layer was entered.
    fn container_has_unsaved_changes(&self, id: EntityId) -> bool {
        let node = self.node(id);
        if node.state == OverrideState::NotDefined {
            return false;
        }
        if node.flags.unsaved(node.state) {
            return true;
        }
        if self
            .child_ids(id)
            .into_iter()
            .any(|child| self.has_unsaved_changes(child))
        {
            return true;
        }
        let initial = match &node.kind {
            NodeKind::DictMutable(dict) => &dict.initial_value,
            NodeKind::List(list) => &list.initial_value,
            NodeKind::ListStrict(list) => &list.initial_value,
            _ => return false,
        };
        self.settings_value(id) != *initial
    }

    // -- Loading --

    pub fn update_default_value(&mut self, id: EntityId, value: Option<Value>) {
        self.update_value(id, Layer::Default, value);
    }

    pub fn update_studio_value(&mut self, id: EntityId, value: Option<Value>) {
        self.update_value(id, Layer::Studio, value);
    }

    pub fn update_project_value(&mut self, id: EntityId, value: Option<Value>) {
        self.update_value(id, Layer::Project, value);
    }

    pub(crate) fn update_value(&mut self, id: EntityId, layer: Layer, value: Option<Value>) {
        match &self.node(id).kind {
            NodeKind::Input(_) => self.input_update(id, layer, value),
            NodeKind::DictFixed(_) => self.dict_update(id, layer, value),
            NodeKind::DictMutable(_) => self.mutable_update(id, layer, value),
            NodeKind::List(_) => self.list_update(id, layer, value),
            NodeKind::ListStrict(_) => self.strict_update(id, layer, value),
        }
    }

    /// Validate stored value `value` against the container type or warn and
    /// drop it.
    pub(crate) fn checked_update<T>(
        &self,
        id: EntityId,
        layer: Layer,
        value: Option<Value>,
        convert: impl FnOnce(Value) -> Result<T, Value>,
    ) -> Option<T> {
        match convert(value?) {
            Ok(value) => Some(value),
            Err(invalid) => {
                tracing::warn!(
                    path = %self.path(id),
                    layer = ?layer,
                    value = %invalid,
                    "Stored value has invalid type, ignoring it",
                );
                None
            }
        }
    }

    // -- Override state --

    /// Resolve the whole tree against `state`.
    ///
    /// Fails without touching the tree when `state` is above DEFAULTS and a
    /// static entity has no default value.
    pub fn set_override_state(&mut self, state: OverrideState) -> Result<(), SettingsError> {
        self.set_override_state_with(state, false)
    }

    /// Same as [`EntityTree::set_override_state`]; `ignore_missing_defaults`
    /// skips the default value check.
    pub fn set_override_state_with(
        &mut self,
        state: OverrideState,
        ignore_missing_defaults: bool,
    ) -> Result<(), SettingsError> {
        if !ignore_missing_defaults {
            self.check_value_sources(self.root, state)?;
        }
        self.state = state;
        self.apply_override_state(self.root, state);
        Ok(())
    }

    fn check_value_sources(&self, id: EntityId, state: OverrideState) -> Result<(), SettingsError> {
        let node = self.node(id);
        if node.is_dynamic() {
            return Ok(());
        }
        if let NodeKind::DictFixed(dict) = &node.kind {
            for child in &dict.children {
                self.check_value_sources(*child, state)?;
            }
            return Ok(());
        }

        // A studio or project override never stands in for a missing default.
        if state > OverrideState::Defaults && !node.flags.has_default_value {
            return Err(SettingsError::DefaultsNotDefined(self.path(id)));
        }
        Ok(())
    }

    pub(crate) fn apply_override_state(&mut self, id: EntityId, state: OverrideState) {
        self.node_mut(id).state = state;
        match &self.node(id).kind {
            NodeKind::Input(_) => self.input_apply_state(id, state),
            NodeKind::DictFixed(_) => self.dict_apply_state(id, state),
            NodeKind::DictMutable(_) => self.mutable_apply_state(id, state),
            NodeKind::List(_) => self.list_apply_state(id, state),
            NodeKind::ListStrict(_) => self.strict_apply_state(id, state),
        }
    }

    // -- Change propagation --

    /// Register an observer called after every change of the tree.
    pub fn register_on_change(&mut self, callback: impl FnMut() + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn clear_on_change_callbacks(&mut self) {
        self.callbacks.clear();
    }

    pub(crate) fn notify(&mut self) {
        for callback in &mut self.callbacks {
            callback();
        }
    }

    /// Refresh `id` and its ancestors, then notify observers.
    ///
    /// Propagation stops at a container that ignores child changes.
    pub(crate) fn on_change(&mut self, id: EntityId) {
        let mut current = id;
        loop {
            self.refresh(current);
            let Some(parent) = self.node(current).parent else {
                self.notify();
                return;
            };
            if !self.accept_child_change(parent) {
                return;
            }
            current = parent;
        }
    }

    /// Container reaction to a changed child; `false` stops propagation.
    fn accept_child_change(&mut self, id: EntityId) -> bool {
        if self.node(id).ignore_child_changes {
            return false;
        }
        let state = self.node(id).state;
        match &self.node(id).kind {
            NodeKind::List(_) => self.node_mut(id).flags.mark(state),
            NodeKind::ListStrict(_) => self.strict_sync_flags(id),
            _ => {}
        }
        true
    }

    /// Mark the override of the active layer on a container and notify.
    pub(crate) fn on_value_change(&mut self, id: EntityId) {
        let state = self.node(id).state;
        self.node_mut(id).flags.mark(state);
        self.on_change(id);
    }

    fn refresh(&mut self, id: EntityId) {
        match &self.node(id).kind {
            NodeKind::Input(_) => self.input_refresh(id),
            NodeKind::DictFixed(_) => self.dict_update_current_metadata(id),
            _ => {}
        }
    }

    fn refresh_subtree(&mut self, id: EntityId) {
        for child in self.child_ids(id) {
            self.refresh_subtree(child);
        }
        self.refresh(id);
    }

    /// Run `f` with child notifications of `id` suppressed.
    pub(crate) fn with_ignored_child_changes<R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = std::mem::replace(&mut self.node_mut(id).ignore_child_changes, true);
        let result = f(self);
        self.node_mut(id).ignore_child_changes = previous;
        result
    }

    /// Run a subtree action, then refresh the subtree and notify once.
    fn run_action(&mut self, id: EntityId, action: fn(&mut Self, EntityId)) {
        self.with_ignored_child_changes(id, |tree| action(tree, id));
        self.refresh_subtree(id);
        self.on_change(id);
    }

    // -- Actions --

    /// Drop unsaved changes of the subtree.
    pub fn discard_changes(&mut self, id: EntityId) {
        self.run_action(id, Self::discard_inner);
    }

    /// Studio layer only: store the current value as studio override.
    pub fn set_studio_default(&mut self, id: EntityId) {
        self.run_action(id, Self::set_studio_default_inner);
    }

    /// Studio layer only: remove the studio override and use defaults.
    pub fn reset_to_pype_default(&mut self, id: EntityId) {
        self.run_action(id, Self::reset_to_pype_default_inner);
    }

    /// Project layer only: store the current value as project override.
    pub fn set_as_overridden(&mut self, id: EntityId) {
        self.run_action(id, Self::set_as_overridden_inner);
    }

    /// Project layer only: remove the project override.
    pub fn remove_overrides(&mut self, id: EntityId) {
        self.run_action(id, Self::remove_overrides_inner);
    }

    fn discard_inner(&mut self, id: EntityId) {
        match &self.node(id).kind {
            NodeKind::Input(_) => self.input_discard(id),
            NodeKind::DictFixed(_) => self.each_child(id, Self::discard_inner),
            NodeKind::DictMutable(_) | NodeKind::List(_) => {
                self.node_mut(id).flags.restore();
                let state = self.node(id).state;
                self.apply_override_state(id, state);
            }
            NodeKind::ListStrict(_) => {
                self.node_mut(id).flags.restore();
                self.each_child(id, Self::discard_inner);
            }
        }
    }

    fn set_studio_default_inner(&mut self, id: EntityId) {
        if self.node(id).state != OverrideState::Studio {
            return;
        }
        match &self.node(id).kind {
            NodeKind::DictFixed(_) => self.each_child(id, Self::set_studio_default_inner),
            _ => self.node_mut(id).flags.has_studio_override = true,
        }
    }

    fn reset_to_pype_default_inner(&mut self, id: EntityId) {
        if self.node(id).state != OverrideState::Studio {
            return;
        }
        match &self.node(id).kind {
            NodeKind::Input(_) => self.input_reset_to_default(id),
            NodeKind::DictFixed(_) => self.each_child(id, Self::reset_to_pype_default_inner),
            NodeKind::DictMutable(_) => {
                self.node_mut(id).flags.has_studio_override = false;
                self.mutable_rebuild(id, Layer::Default);
            }
            NodeKind::List(_) => {
                self.node_mut(id).flags.has_studio_override = false;
                self.list_rebuild(id, Layer::Default);
            }
            NodeKind::ListStrict(_) => {
                self.each_child(id, Self::reset_to_pype_default_inner);
                self.node_mut(id).flags.has_studio_override = false;
            }
        }
    }

    fn set_as_overridden_inner(&mut self, id: EntityId) {
        if self.node(id).state != OverrideState::Project {
            return;
        }
        match &self.node(id).kind {
            NodeKind::DictFixed(_) => self.each_child(id, Self::set_as_overridden_inner),
            _ => self.node_mut(id).flags.has_project_override = true,
        }
    }

    fn remove_overrides_inner(&mut self, id: EntityId) {
        let node = self.node(id);
        if node.state != OverrideState::Project {
            return;
        }
        let fallback = if node.flags.has_studio_override {
            Layer::Studio
        } else {
            Layer::Default
        };
        match &node.kind {
            NodeKind::Input(_) => self.input_remove_overrides(id),
            NodeKind::DictFixed(_) => self.each_child(id, Self::remove_overrides_inner),
            NodeKind::DictMutable(_) => {
                if node.flags.has_project_override {
                    self.node_mut(id).flags.has_project_override = false;
                    self.mutable_rebuild(id, fallback);
                }
            }
            NodeKind::List(_) => {
                if node.flags.has_project_override {
                    self.node_mut(id).flags.has_project_override = false;
                    self.list_rebuild(id, fallback);
                }
            }
            NodeKind::ListStrict(_) => {
                self.each_child(id, Self::remove_overrides_inner);
                self.node_mut(id).flags.has_project_override = false;
            }
        }
    }

    fn each_child(&mut self, id: EntityId, action: fn(&mut Self, EntityId)) {
        for child in self.child_ids(id) {
            action(self, child);
        }
    }
}

//! In-memory base type store.
//!
//! Declarations (classes, type parameters) are added through `&mut self`
//! while the program is being lowered. Type handles are interned through
//! `&self` so the engine can build substituted types at query time while the
//! store is shared behind an `Arc`.

use crate::base::{
    BaseTypeData, BaseTypeId, BaseTypeOracle, ClassDecl, ClassId, PrimitiveKind, TypeParamDecl,
    TypeParamId, Variance,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

pub struct BaseTypeStore {
    classes: Vec<ClassDecl>,
    class_names: FxHashMap<String, ClassId>,
    type_params: Vec<TypeParamDecl>,
    key_to_index: RwLock<FxHashMap<BaseTypeData, BaseTypeId>>,
    index_to_key: RwLock<Vec<BaseTypeData>>,
    object_class: ClassId,
}

impl std::fmt::Debug for BaseTypeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseTypeStore")
            .field("classes", &self.classes.len())
            .field("type_params", &self.type_params.len())
            .finish_non_exhaustive()
    }
}

impl BaseTypeStore {
    /// Create a store containing only the root class `Object`.
    pub fn new() -> Self {
        let mut store = BaseTypeStore {
            classes: Vec::new(),
            class_names: FxHashMap::default(),
            type_params: Vec::new(),
            key_to_index: RwLock::new(FxHashMap::default()),
            index_to_key: RwLock::new(Vec::new()),
            object_class: ClassId(0),
        };
        store.object_class = store.add_class("Object", &[]).0;
        store
    }

    /// Declare a class with fresh type parameters bounded by `Object`.
    ///
    /// Returns the class id and its type parameters in declaration order.
    pub fn add_class(&mut self, name: &str, type_params: &[&str]) -> (ClassId, Vec<TypeParamId>) {
        let params: Vec<TypeParamId> = type_params.iter().map(|n| self.add_type_param(n)).collect();
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassDecl {
            name: name.to_string(),
            type_params: params.clone(),
            supertypes: Vec::new(),
            is_interface: false,
        });
        self.class_names.insert(name.to_string(), id);
        (id, params)
    }

    /// Declare a standalone type parameter (used for generic methods),
    /// bounded by `Object`.
    pub fn add_type_param(&mut self, name: &str) -> TypeParamId {
        let id = TypeParamId(self.type_params.len() as u32);
        let upper_bound = self.object();
        self.type_params.push(TypeParamDecl {
            name: name.to_string(),
            upper_bound,
            variance: None,
        });
        id
    }

    pub fn add_supertype(&mut self, class: ClassId, supertype: BaseTypeId) {
        if let Some(decl) = self.classes.get_mut(class.0 as usize) {
            decl.supertypes.push(supertype);
        }
    }

    pub fn set_interface(&mut self, class: ClassId, is_interface: bool) {
        if let Some(decl) = self.classes.get_mut(class.0 as usize) {
            decl.is_interface = is_interface;
        }
    }

    pub fn set_upper_bound(&mut self, param: TypeParamId, bound: BaseTypeId) {
        if let Some(decl) = self.type_params.get_mut(param.0 as usize) {
            decl.upper_bound = bound;
        }
    }

    pub fn set_variance(&mut self, param: TypeParamId, variance: Variance) {
        if let Some(decl) = self.type_params.get_mut(param.0 as usize) {
            decl.variance = Some(variance);
        }
    }

    pub fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_names.get(name).copied()
    }

    pub fn declared(&self, class: ClassId, args: &[BaseTypeId]) -> BaseTypeId {
        self.intern(BaseTypeData::Declared {
            class,
            args: args.iter().copied().collect(),
        })
    }

    pub fn array(&self, elem: BaseTypeId) -> BaseTypeId {
        self.intern(BaseTypeData::Array(elem))
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> BaseTypeId {
        self.intern(BaseTypeData::Primitive(kind))
    }

    pub fn type_var(&self, param: TypeParamId) -> BaseTypeId {
        self.intern(BaseTypeData::TypeVariable(param))
    }

    pub fn void(&self) -> BaseTypeId {
        self.intern(BaseTypeData::Void)
    }

    pub fn error(&self) -> BaseTypeId {
        self.intern(BaseTypeData::Error)
    }

    pub fn len(&self) -> usize {
        self.index_to_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View `ty` as an instantiation of `target` by walking the supertype
    /// graph breadth-first.
    ///
    /// Example: `ArrayList<String>` viewed as `List` is `List<String>`.
    pub fn as_super(&self, ty: BaseTypeId, target: ClassId) -> Option<BaseTypeId> {
        let mut queue = VecDeque::from([ty]);
        let mut seen = FxHashSet::default();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if self.class_of(current) == Some(target) {
                return Some(current);
            }
            queue.extend(self.direct_supertypes(current));
        }
        None
    }

    fn declared_subtype(&self, sub: BaseTypeId, sup: BaseTypeId, class: ClassId) -> bool {
        let Some(view) = self.as_super(sub, class) else {
            return false;
        };
        if view == sup {
            return true;
        }
        // Raw uses on either side are compatible with any instantiation.
        let view_args = self.type_arguments(view);
        let sup_args = self.type_arguments(sup);
        view_args.is_empty() || sup_args.is_empty()
    }
}

impl Default for BaseTypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseTypeOracle for BaseTypeStore {
    fn lookup(&self, id: BaseTypeId) -> Option<BaseTypeData> {
        self.index_to_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0 as usize)
            .cloned()
    }

    fn intern(&self, data: BaseTypeData) -> BaseTypeId {
        if let Some(&id) = self
            .key_to_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&data)
        {
            return id;
        }

        let mut key_to_index = self
            .key_to_index
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another thread may have interned it between the two locks.
        if let Some(&id) = key_to_index.get(&data) {
            return id;
        }
        let mut index_to_key = self
            .index_to_key
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let id = BaseTypeId(index_to_key.len() as u32);
        index_to_key.push(data.clone());
        key_to_index.insert(data, id);
        id
    }

    fn class(&self, id: ClassId) -> Option<&ClassDecl> {
        self.classes.get(id.0 as usize)
    }

    fn type_param(&self, id: TypeParamId) -> Option<&TypeParamDecl> {
        self.type_params.get(id.0 as usize)
    }

    fn object_class(&self) -> ClassId {
        self.object_class
    }

    fn is_subtype(&self, sub: BaseTypeId, sup: BaseTypeId) -> bool {
        if sub == sup {
            return true;
        }
        let (Some(sub_data), Some(sup_data)) = (self.lookup(sub), self.lookup(sup)) else {
            return false;
        };
        match (&sub_data, &sup_data) {
            (BaseTypeData::Error, _) | (_, BaseTypeData::Error) => true,
            (
                BaseTypeData::Null,
                BaseTypeData::Declared { .. }
                | BaseTypeData::Array(_)
                | BaseTypeData::TypeVariable(_),
            ) => true,
            (BaseTypeData::Primitive(a), BaseTypeData::Primitive(b)) => a.widens_to(*b),
            (BaseTypeData::Array(a), BaseTypeData::Array(b)) => {
                let a_is_primitive = matches!(self.lookup(*a), Some(BaseTypeData::Primitive(_)));
                let b_is_primitive = matches!(self.lookup(*b), Some(BaseTypeData::Primitive(_)));
                if a_is_primitive || b_is_primitive {
                    a == b
                } else {
                    self.is_subtype(*a, *b)
                }
            }
            (BaseTypeData::TypeVariable(p), _) => self
                .type_param(*p)
                .is_some_and(|decl| self.is_subtype(decl.upper_bound, sup)),
            (
                BaseTypeData::Declared { .. } | BaseTypeData::Array(_),
                BaseTypeData::Declared { class, .. },
            ) => self.declared_subtype(sub, sup, *class),
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "../tests/store_tests.rs"]
mod tests;

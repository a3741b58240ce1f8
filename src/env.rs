use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::trace;

use crate::{ast::Hops, types::Type, util::intern::Symbol, value::Value};

/// A runtime scope. Children point to their parent; nothing points down.
#[derive(Debug)]
pub struct Scope<'p> {
    bindings: RefCell<HashMap<Symbol, Binding<'p>>>,
    parent: Option<Rc<Scope<'p>>>,
}

#[derive(Debug)]
pub struct Binding<'p> {
    /// The declared type. Values stored later are widened to it.
    pub ty: Type,
    pub value: Value<'p>,
    pub constant: bool,
}

impl<'p> Scope<'p> {
    pub fn root() -> Rc<Scope<'p>> {
        Rc::new(Scope {
            bindings: RefCell::default(),
            parent: None,
        })
    }

    pub fn child(parent: &Rc<Scope<'p>>) -> Rc<Scope<'p>> {
        Rc::new(Scope {
            bindings: RefCell::default(),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Binds `name` in this very scope, shadowing any outer binding.
    pub fn define(&self, name: Symbol, mut binding: Binding<'p>) {
        trace!("define {name:?}: {}", binding.ty);
        binding.value = binding.value.widen_to(binding.ty);
        self.bindings.borrow_mut().insert(name, binding);
    }

    /// Returns the value of `name` as bound exactly `hops` scopes up.
    pub fn get(&self, hops: Hops, name: Symbol) -> Option<Value<'p>> {
        trace!("lookup {name:?} at {}", hops.0);
        let scope = self.ancestor(hops)?;
        let value = scope.bindings.borrow().get(&name)?.value.clone();
        Some(value)
    }

    /// Overwrites the binding of `name` found exactly `hops` scopes up,
    /// widening `value` to the declared type. Returns the stored value, or
    /// `None` if there is no such binding.
    pub fn assign(&self, hops: Hops, name: Symbol, value: Value<'p>) -> Option<Value<'p>> {
        trace!("assign {name:?} at {}", hops.0);
        let scope = self.ancestor(hops)?;
        let mut bindings = scope.bindings.borrow_mut();
        let binding = bindings.get_mut(&name)?;
        binding.value = value.widen_to(binding.ty);
        Some(binding.value.clone())
    }

    fn ancestor(&self, Hops(hops): Hops) -> Option<&Scope<'p>> {
        let mut scope = self;
        for _ in 0..hops {
            scope = scope.parent.as_deref()?;
        }
        Some(scope)
    }
}

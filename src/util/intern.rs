use std::{collections::HashMap, fmt, num::NonZeroU32, rc::Rc};

/// A handle to an interned name. To retrieve the `&str`, use
/// [`Interner::get`].
///
/// Symbols from different interners must not be mixed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    // Here we use a NonZeroU32 to leverage niche layout optimization, which
    // keeps `Option<Symbol>` as small as `Symbol`.
    handle: NonZeroU32,
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.handle)
    }
}

/// Identifier table of a single run. Each distinct name is stored once.
pub struct Interner {
    map: HashMap<Rc<str>, Symbol>,
    names: Vec<Rc<str>>,
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (i, name) in self.names.iter().enumerate() {
            map.entry(&(i + 1), name);
        }
        map.finish()
    }
}

impl Interner {
    pub fn with_capacity(capacity: usize) -> Interner {
        Interner {
            map: HashMap::with_capacity(capacity),
            names: Vec::with_capacity(capacity),
        }
    }

    /// Interns the provided name, returning a handle which can be used to
    /// retrieve it later.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(symbol) = self.map.get(name) {
            return *symbol;
        }
        let len = u32::try_from(self.names.len()).expect("interner out of capacity");
        let handle = NonZeroU32::new(len + 1).expect("handles start at one");
        let symbol = Symbol { handle };
        let key: Rc<str> = Rc::from(name);
        self.names.push(Rc::clone(&key));
        self.map.insert(key, symbol);
        symbol
    }

    /// Returns the name behind the provided [`Symbol`].
    ///
    /// Panics if the symbol was produced by another interner.
    pub fn get(&self, symbol: impl Into<Symbol>) -> &str {
        let symbol: Symbol = symbol.into();
        &self.names[symbol.handle.get() as usize - 1]
    }
}

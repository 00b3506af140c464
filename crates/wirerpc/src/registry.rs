//! # Endpoint Registry
//!
//! The Registry is the source of truth for what a server can be asked to do.
//! It maps `(collection, function)` wire names to a declared parameter signature and a handler.
//!
//! ## Philosophy
//!
//! - **Startup-Time Safety**: Duplicate endpoints are rejected when registered, never at call time.
//! - **Resolve Once**: Names are resolved to an `EndpointId` and everything after that is an
//!   index lookup. Wire strings only matter at the serialization boundary.
//! - **Immutable After Start**: The registry is moved into a `Dispatcher` and never changes again.

use std::collections::HashMap;
use std::sync::Arc;

use wirepack::TypeTag;
use wirepack::Value;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The `(collection, function)` pair is already registered.
    DuplicateEndpoint { collection: String, function: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DuplicateEndpoint { collection, function } => {
                write!(f, "endpoint '{}.{}' is already registered", collection, function)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A handler receives the server context, the call's correlation id and the validated arguments,
/// and returns the result list (status first).
pub type Handler<C> = Arc<dyn Fn(&C, u64, &[Value]) -> Vec<Value> + Send + Sync>;

/// Index of a registered endpoint.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct EndpointId(usize);

/// A registered function.
pub struct Function<C> {
    pub collection: String,
    pub name: String,
    pub params: Vec<TypeTag>,
    pub(crate) handler: Handler<C>,
}

impl<C> Function<C> {
    pub fn handler(&self) -> &Handler<C> {
        &self.handler
    }
}

impl<C> std::fmt::Debug for Function<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("collection", &self.collection)
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A named group of functions, registered as a unit.
pub struct Collection<C> {
    name: String,
    functions: Vec<(String, Vec<TypeTag>, Handler<C>)>,
}

impl<C> Collection<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), functions: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a function to the collection.
    ///
    /// # Errors
    /// Returns `Error::DuplicateEndpoint` if the collection already has a function of that name.
    pub fn register_function<F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<TypeTag>,
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&C, u64, &[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.functions.iter().any(|(existing, _, _)| *existing == name) {
            return Err(Error::DuplicateEndpoint { collection: self.name.clone(), function: name });
        }
        self.functions.push((name, params, Arc::new(handler)));
        Ok(self)
    }
}

/// The startup-time endpoint table.
pub struct Registry<C> {
    entries: Vec<Function<C>>,
    index: HashMap<String, HashMap<String, EndpointId>>,
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self { entries: Vec::new(), index: HashMap::new() }
    }

    /// Registers a single endpoint.
    ///
    /// # Errors
    /// Returns `Error::DuplicateEndpoint` if the pair is already present.
    pub fn register(
        &mut self,
        collection: &str,
        function: &str,
        params: Vec<TypeTag>,
        handler: Handler<C>,
    ) -> Result<EndpointId> {
        let functions = self.index.entry(collection.to_string()).or_default();
        if functions.contains_key(function) {
            return Err(Error::DuplicateEndpoint {
                collection: collection.to_string(),
                function: function.to_string(),
            });
        }

        let id = EndpointId(self.entries.len());
        functions.insert(function.to_string(), id);
        self.entries.push(Function {
            collection: collection.to_string(),
            name: function.to_string(),
            params,
            handler,
        });
        Ok(id)
    }

    /// Registers every function of a collection. Stops at the first duplicate.
    pub fn register_collection(&mut self, collection: Collection<C>) -> Result<()> {
        let Collection { name, functions } = collection;
        for (function, params, handler) in functions {
            self.register(&name, &function, params, handler)?;
        }
        Ok(())
    }

    /// Looks up the endpoint for a wire name pair.
    pub fn resolve(&self, collection: &str, function: &str) -> Option<EndpointId> {
        self.index.get(collection).and_then(|f| f.get(function)).copied()
    }

    pub fn get(&self, id: EndpointId) -> Option<&Function<C>> {
        self.entries.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function<C>> {
        self.entries.iter()
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

//! The registry's pluggable unit of work (spec §9 redesign flag: "duck-typed
//! 'retriever' registration" becomes a trait with a namespace-keyed registry).

use std::collections::HashMap;

use anyhow::Result;

use crate::protocol::Response;

pub trait Retriever: Send + Sync {
    fn namespace(&self) -> &str;

    /// Load resources (index, model) once at daemon startup.
    fn warmup(&mut self) -> Result<()>;

    fn search(&self, query: &str, limit: usize) -> Result<Response>;

    /// Release resources held by the retriever. Default: nothing to do.
    fn shutdown(&mut self) {}
}

#[derive(Default)]
pub struct Registry {
    retrievers: HashMap<String, Box<dyn Retriever>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, retriever: Box<dyn Retriever>) {
        self.retrievers.insert(retriever.namespace().to_string(), retriever);
    }

    /// Warm up every registered retriever in registration order.
    pub fn warmup_all(&mut self) -> Result<()> {
        for retriever in self.retrievers.values_mut() {
            retriever.warmup()?;
        }
        Ok(())
    }

    pub fn search(&self, namespace: &str, query: &str, limit: usize) -> Response {
        match self.retrievers.get(namespace) {
            Some(retriever) => retriever.search(query, limit).unwrap_or_else(|e| Response::error(e.to_string())),
            None => Response::error(format!("unknown namespace: {namespace}")),
        }
    }

    pub fn shutdown_all(&mut self) {
        for retriever in self.retrievers.values_mut() {
            retriever.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    impl Retriever for Echo {
        fn namespace(&self) -> &str {
            "echo"
        }
        fn warmup(&mut self) -> Result<()> {
            Ok(())
        }
        fn search(&self, query: &str, _limit: usize) -> Result<Response> {
            Ok(Response {
                formatted: query.to_string(),
                ..Default::default()
            })
        }
    }

    #[test]
    fn unknown_namespace_returns_an_error_response() {
        let registry = Registry::new();
        let response = registry.search("nonexistent", "q", 5);
        assert!(response.error.is_some());
    }

    #[test]
    fn registered_retriever_is_dispatched_to() {
        let mut registry = Registry::new();
        registry.register(Box::new(Echo));
        registry.warmup_all().unwrap();
        let response = registry.search("echo", "hello", 5);
        assert_eq!(response.formatted, "hello");
    }
}

//! # Provider Registry
//!
//! Where handler parameter values come from.
//!
//! Resolution consults, in order:
//!
//! 1. the built-in table: framework types matched by exact `TypeId`
//!    ([`ResponseWriter`](crate::ResponseWriter), [`Request`](crate::Request),
//!    [`QueryParams`](crate::typed::QueryParams), [`RawBody`](crate::typed::RawBody), ...)
//! 2. host providers, in registration order
//! 3. structural fallback by [`ArgShape`](crate::typed::ArgShape), done by the input planner
//!
//! Built-ins always win over host providers for the same type.
//!
//! ## Host providers
//!
//! Implement [`Provider`] for full control, or register an [`ArgExtractor<T>`] for the
//! common "build a `T` from the request" case:
//!
//! ```rust
//! use brrtbind::registry::{ArgExtractor, Registry};
//! use brrtbind::typed::{Arg, ArgType};
//!
//! #[derive(Debug, Clone)]
//! struct Tenant(String);
//!
//! impl Arg for Tenant {
//!     fn arg_type() -> ArgType {
//!         ArgType::of::<Self>()
//!     }
//! }
//!
//! let registry = Registry::builder()
//!     .extractor(ArgExtractor::new(|req| {
//!         Ok(Tenant(req.header("x-tenant").unwrap_or("public").to_string()))
//!     }))
//!     .build()
//!     .unwrap();
//! assert_eq!(registry.len(), 1);
//! ```
//!
//! Registering two extractors for the same `T`, or an extractor without an
//! extraction function, fails when the registry is built.

mod builtin;

pub(crate) use builtin::{lookup as builtin, CallScope};

use crate::error::ConfigError;
use crate::router::ParamVec;
use crate::server::Request;
use crate::typed::{Arg, ArgType, ArgValue};
use http::Method;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// A provider's answer to "can you supply this parameter?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applicability {
    /// The provider consumes the request body.
    pub reads_body: bool,
}

/// Supplies handler parameter values from requests.
pub trait Provider: Send + Sync {
    /// `Some` if this provider supplies `arg` for routes with `method` and `path`.
    fn is_applicable(&self, arg: &ArgType, method: &Method, path: &str) -> Option<Applicability>;

    /// Produce a value of exactly the type described by `arg`.
    fn build_value(
        &self,
        arg: &ArgType,
        request: &Request,
        path_params: &ParamVec,
    ) -> anyhow::Result<ArgValue>;
}

type ExtractFn<T> = Arc<dyn Fn(&Request) -> anyhow::Result<T> + Send + Sync>;

/// Single-type convenience provider: an extraction function plus a body flag.
pub struct ArgExtractor<T> {
    extract: Option<ExtractFn<T>>,
    reads_body: bool,
}

impl<T: Arg> ArgExtractor<T> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&Request) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            extract: Some(Arc::new(extract)),
            reads_body: false,
        }
    }

    /// An extractor with no extraction function; rejected by [`RegistryBuilder::build`].
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            extract: None,
            reads_body: false,
        }
    }

    #[must_use]
    pub fn reads_body(mut self, reads_body: bool) -> Self {
        self.reads_body = reads_body;
        self
    }
}

struct ExtractorProvider<T> {
    extract: ExtractFn<T>,
    reads_body: bool,
}

impl<T: Arg> Provider for ExtractorProvider<T> {
    fn is_applicable(&self, arg: &ArgType, _method: &Method, _path: &str) -> Option<Applicability> {
        arg.is::<T>().then_some(Applicability {
            reads_body: self.reads_body,
        })
    }

    fn build_value(
        &self,
        _arg: &ArgType,
        request: &Request,
        _path_params: &ParamVec,
    ) -> anyhow::Result<ArgValue> {
        Ok(Box::new((self.extract)(request)?))
    }
}

enum Pending {
    Provider(Arc<dyn Provider>),
    Extractor {
        type_id: TypeId,
        type_name: &'static str,
        provider: Option<Arc<dyn Provider>>,
    },
}

/// Collects host providers; validated by [`build`](RegistryBuilder::build).
#[derive(Default)]
pub struct RegistryBuilder {
    pending: Vec<Pending>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.pending.push(Pending::Provider(Arc::new(provider)));
        self
    }

    #[must_use]
    pub fn extractor<T: Arg>(mut self, extractor: ArgExtractor<T>) -> Self {
        let reads_body = extractor.reads_body;
        let provider = extractor.extract.map(|extract| {
            Arc::new(ExtractorProvider { extract, reads_body }) as Arc<dyn Provider>
        });
        self.pending.push(Pending::Extractor {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            provider,
        });
        self
    }

    pub fn build(self) -> Result<Registry, ConfigError> {
        let mut seen = HashSet::new();
        let mut providers = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            match pending {
                Pending::Provider(p) => providers.push(p),
                Pending::Extractor {
                    type_id,
                    type_name,
                    provider,
                } => {
                    if !seen.insert(type_id) {
                        return Err(ConfigError::DuplicateMapping {
                            type_name: type_name.to_string(),
                        });
                    }
                    let Some(p) = provider else {
                        return Err(ConfigError::MissingExtract {
                            type_name: type_name.to_string(),
                        });
                    };
                    providers.push(p);
                }
            }
        }

        // P1: Registry built
        debug!(providers = providers.len(), "Provider registry built");

        Ok(Registry {
            providers: Arc::new(providers),
        })
    }
}

/// Ordered host providers. Cheap to clone.
#[derive(Clone, Default)]
pub struct Registry {
    providers: Arc<Vec<Arc<dyn Provider>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// First host provider applicable to `arg`, with its position.
    pub(crate) fn find(
        &self,
        arg: &ArgType,
        method: &Method,
        path: &str,
    ) -> Option<(usize, Arc<dyn Provider>, Applicability)> {
        self.providers.iter().enumerate().find_map(|(idx, p)| {
            p.is_applicable(arg, method, path)
                .map(|app| (idx, Arc::clone(p), app))
        })
    }
}

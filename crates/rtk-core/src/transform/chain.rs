//! Transformer chain: resolve, validate, execute.
//!
//! All structural checks happen in [`TransformerChain::resolve`], before any
//! item flows. [`TransformerChain::execute`] builds fresh stages each time
//! and returns a lazy [`ChainRun`]; nothing is pulled from the source until
//! the run itself is pulled.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::{Item, ItemType, Stage, Transformer};
use crate::config::{merge_options, Config};
use crate::errors::{Result, RtkError};
use crate::registry::Registry;
use crate::rules::Options;
use crate::stream::{BoxStream, FailFast, StopSignal, StreamExt};

/// Caller-side constraints for one transform call
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Required type of the chain's final output
    pub end_type: ItemType,
    /// Per-transformer options overriding the config, key by key
    pub overrides: BTreeMap<String, Options>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            end_type: ItemType::String,
            overrides: BTreeMap::new(),
        }
    }
}

impl TransformOptions {
    pub fn with_end_type(mut self, end_type: ItemType) -> Self {
        self.end_type = end_type;
        self
    }

    pub fn with_override(mut self, transformer_id: impl Into<String>, options: Options) -> Self {
        self.overrides.insert(transformer_id.into(), options);
        self
    }
}

#[derive(Clone)]
struct Link {
    transformer: Arc<dyn Transformer>,
    options: Options,
}

/// A validated, ordered list of transformers with their options
#[derive(Clone)]
pub struct TransformerChain {
    links: Vec<Link>,
    appended_default: bool,
}

impl TransformerChain {
    /// Look up, configure and type-check a chain
    ///
    /// # Errors
    ///
    /// - `ConfigValidation` for an empty chain, an unknown id, rejected
    ///   options, or an end type no default transformer can reach
    /// - `ChainTypeMismatch` naming both transformers and both types when
    ///   adjacent transformers disagree
    pub fn resolve<S: AsRef<str>>(
        ids: &[S],
        registry: &Registry,
        config: &Config,
        options: &TransformOptions,
    ) -> Result<Self> {
        if ids.is_empty() {
            return Err(RtkError::EmptyChain.into());
        }
        let mut links = Vec::with_capacity(ids.len() + 1);
        for id in ids {
            let id = id.as_ref();
            let transformer = registry
                .transformer(id)
                .ok_or_else(|| RtkError::UnknownTransformer {
                    transformer_id: id.to_string(),
                })?;
            links.push(Self::configure(transformer, config, options)?);
        }

        for pair in links.windows(2) {
            let (upstream, downstream) = (&pair[0].transformer, &pair[1].transformer);
            if upstream.output_type() != downstream.input_type() {
                return Err(RtkError::ChainTypeMismatch {
                    upstream: upstream.id().to_string(),
                    output_type: upstream.output_type().to_string(),
                    downstream: downstream.id().to_string(),
                    input_type: downstream.input_type().to_string(),
                }
                .into());
            }
        }

        let mut appended_default = false;
        let current = links
            .last()
            .map(|l| l.transformer.output_type())
            .unwrap_or(options.end_type);
        if current != options.end_type {
            let default = registry.default_transformer(options.end_type).ok_or_else(|| {
                RtkError::NoDefaultTransformer {
                    end_type: options.end_type.to_string(),
                }
            })?;
            if default.input_type() != current || default.output_type() != options.end_type {
                return Err(RtkError::DefaultTransformerMismatch {
                    transformer_id: default.id().to_string(),
                    input_type: default.input_type().to_string(),
                    output_type: current.to_string(),
                }
                .into());
            }
            links.push(Self::configure(default, config, options)?);
            appended_default = true;
        }

        Ok(Self {
            links,
            appended_default,
        })
    }

    fn configure(
        transformer: Arc<dyn Transformer>,
        config: &Config,
        options: &TransformOptions,
    ) -> Result<Link> {
        let mut merged = config.transformer_options(transformer.id());
        if let Some(overrides) = options.overrides.get(transformer.id()) {
            merge_options(&mut merged, overrides);
        }
        // instantiate once so rejected options surface before execution
        transformer.transform(&merged)?;
        Ok(Link {
            transformer,
            options: merged,
        })
    }

    /// Transformer ids in execution order, including an appended default
    pub fn ids(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.transformer.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn appended_default(&self) -> bool {
        self.appended_default
    }

    pub fn input_type(&self) -> Option<ItemType> {
        self.links.first().map(|l| l.transformer.input_type())
    }

    pub fn output_type(&self) -> Option<ItemType> {
        self.links.last().map(|l| l.transformer.output_type())
    }

    /// Run `source` through fresh stages
    ///
    /// # Errors
    ///
    /// Returns an error if a stage cannot be built; per-item errors surface
    /// from the returned run and end it.
    pub fn execute<'a, I>(&self, source: I) -> Result<ChainRun<'a>>
    where
        I: Iterator<Item = Result<Item>> + 'a,
    {
        let signal = StopSignal::new();
        let mut upstream: BoxStream<'a, Item> = Box::new(source.until_stopped(&signal));
        for link in &self.links {
            let stage = link.transformer.transform(&link.options)?;
            upstream = Box::new(StageIter {
                transformer_id: link.transformer.id().to_string(),
                upstream,
                stage,
                pending: VecDeque::new(),
                upstream_done: false,
            });
        }
        Ok(ChainRun {
            inner: upstream.fail_fast(),
            signal,
        })
    }
}

impl std::fmt::Debug for TransformerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerChain")
            .field("ids", &self.ids())
            .field("appended_default", &self.appended_default)
            .finish()
    }
}

/// One stage pulling from its upstream
struct StageIter<'a> {
    transformer_id: String,
    upstream: BoxStream<'a, Item>,
    stage: Box<dyn Stage>,
    pending: VecDeque<Item>,
    upstream_done: bool,
}

impl Iterator for StageIter<'_> {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(Ok(item));
            }
            if self.upstream_done {
                return None;
            }
            let produced = match self.upstream.next() {
                Some(Ok(item)) => self.stage.process(item),
                Some(Err(e)) => {
                    self.upstream_done = true;
                    return Some(Err(e));
                }
                None => {
                    self.upstream_done = true;
                    self.stage.finish()
                }
            };
            match produced {
                Ok(items) => self.pending.extend(items),
                Err(e) => {
                    self.upstream_done = true;
                    let e = if e.transformer_id().is_none() {
                        e.with_transformer_id(self.transformer_id.clone())
                    } else {
                        e
                    };
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Lazy output of one chain execution
///
/// Single-pass. Ends after the first error. `stop()` (or dropping the run)
/// keeps the source from being pulled again.
pub struct ChainRun<'a> {
    inner: FailFast<BoxStream<'a, Item>>,
    signal: StopSignal,
}

impl ChainRun<'_> {
    pub fn stop(&self) {
        self.signal.stop();
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.signal.clone()
    }
}

impl Iterator for ChainRun<'_> {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

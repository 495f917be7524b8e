//! A loaded object file and the query entry point.
//!
//! [`LoadedFile`] owns everything decoded from one file: the container, the
//! symbol index, optional DWARF and function table, and the compute-once
//! caches filled by queries. It is immutable once published apart from
//! those caches and can be shared across threads behind an `Arc`.

use crate::config::{EngineConfig, FunctabConfig, RuntimeIndices};
use crate::core::range::Range;
use crate::core::symbol::{Symbol, SymbolId};
use crate::error::{ObjError, Result};
use crate::formats::dwarf::DebugInfo;
use crate::formats::{self, Container, ContainerMemory};
use crate::functab::{Func, FuncTab, FunctabError, Liveness};
use crate::io::SafeReader;
use crate::source::{plan_blocks, LineCache};
use crate::symtab::SymbolIndex;
use crate::views::{
    asm, hex, liveness, ranges_from_pairs, source, symbols, Instruction, LivenessView, QueryRequest,
    SourceView, SymbolSelector, ViewResponse,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, info_span, warn};

type LivenessCell = Arc<OnceLock<std::result::Result<Option<Arc<Liveness>>, FunctabError>>>;

pub struct LoadedFile {
    path: Option<PathBuf>,
    config: EngineConfig,
    container: Box<dyn Container>,
    index: SymbolIndex,
    debug: Option<DebugInfo>,
    functab: Option<FuncTab>,
    /// Decoded liveness by function entry PC.
    liveness: Mutex<HashMap<u64, LivenessCell>>,
    lines: LineCache,
}

impl std::fmt::Debug for LoadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFile")
            .field("path", &self.path)
            .field("format", &self.container.format())
            .field("symbols", &self.index.symbols().len())
            .field("debug", &self.debug.is_some())
            .field("functab", &self.functab.is_some())
            .finish()
    }
}

impl LoadedFile {
    /// Maps and loads the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        let span = info_span!("load", path = %path.display());
        let _enter = span.enter();
        let data = SafeReader::open(path, &config.io)?.into_bytes();
        Self::load(Some(path.to_path_buf()), data, config)
    }

    /// Loads an in-memory image.
    pub fn from_bytes(data: Bytes, config: EngineConfig) -> Result<Self> {
        Self::load(None, data, config)
    }

    fn load(path: Option<PathBuf>, data: Bytes, config: EngineConfig) -> Result<Self> {
        let size = data.len();
        let container = formats::open(data)?;
        let index = SymbolIndex::new(container.symbols().to_vec());

        let dwarf = match DebugInfo::load(container.as_ref()) {
            Ok(dwarf) => Some(dwarf),
            Err(err) => {
                debug!(error = %err, "Continuing without DWARF");
                None
            }
        };
        let indices = runtime_indices(dwarf.as_ref(), config.functab.indices);
        let functab = match functab_bytes(container.as_ref(), &index, &config.functab) {
            Some(bytes) => match FuncTab::parse(bytes, indices) {
                Ok(tab) => Some(tab),
                Err(err) => {
                    warn!(error = %err, "Ignoring unreadable function table");
                    None
                }
            },
            None => {
                debug!("No function table");
                None
            }
        };

        let has_dwarf = dwarf.is_some();
        info!(
            format = %container.format(),
            arch = container.arch().map(|a| a.name),
            size,
            symbols = index.symbols().len(),
            sections = container.sections().len(),
            dwarf = has_dwarf,
            funcs = functab.as_ref().map(|t| t.funcs().len()),
            "Loaded object file"
        );

        let lines = LineCache::new(config.io.clone());
        Ok(Self {
            path,
            config,
            container,
            index,
            debug: dwarf,
            functab,
            liveness: Mutex::new(HashMap::new()),
            lines,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    pub fn debug_info(&self) -> Option<&DebugInfo> {
        self.debug.as_ref()
    }

    pub fn functab(&self) -> Option<&FuncTab> {
        self.functab.as_ref()
    }

    /// Resolves a selector to a symbol id.
    pub fn resolve(&self, selector: &SymbolSelector) -> Result<SymbolId> {
        match selector {
            SymbolSelector::Id(id) => self
                .index
                .get(*id)
                .map(|_| *id)
                .ok_or_else(|| ObjError::NotFound(format!("symbol {}", id))),
            SymbolSelector::Name(name) => self
                .index
                .by_name(name)
                .ok_or_else(|| ObjError::NotFound(format!("symbol {}", name))),
        }
    }

    fn symbol(&self, id: SymbolId) -> Result<&Symbol> {
        self.index
            .get(id)
            .ok_or_else(|| ObjError::NotFound(format!("symbol {}", id)))
    }

    /// Liveness of `func`, decoded once. Errors are cached too.
    pub fn liveness(&self, func: &Func) -> Result<Option<Arc<Liveness>>> {
        let Some(functab) = &self.functab else {
            return Ok(None);
        };
        let cell = {
            let mut cache = self.liveness.lock().unwrap_or_else(|e| e.into_inner());
            cache.entry(func.entry).or_default().clone()
        };
        cell.get_or_init(|| {
            let mem = ContainerMemory(self.container.as_ref());
            let decoded = functab.liveness(func, &mem);
            if let Err(err) = &decoded {
                warn!(func = %func.name, error = %err, "Liveness decode failed");
            }
            decoded.map(|l| l.map(Arc::new))
        })
        .clone()
        .map_err(|err| ObjError::decode(format!("function {}", func.name), err))
    }

    /// Liveness view of the function starting at symbol `id`.
    ///
    /// `Ok(None)` when the architecture is unsupported, there is no function
    /// table, no function starts at the symbol, or it has no stack maps.
    pub fn liveness_view(&self, id: SymbolId, insts: &[Instruction]) -> Result<Option<LivenessView>> {
        let (Some(arch), Some(functab)) = (self.container.arch(), &self.functab) else {
            return Ok(None);
        };
        let sym = self.symbol(id)?;
        let Some(func) = functab.func_at_entry(sym.address) else {
            return Ok(None);
        };
        let Some(live) = self.liveness(func)? else {
            return Ok(None);
        };
        let pcsp = functab.pcsp(func)?;
        Ok(Some(liveness::liveness_view(arch, &live, &pcsp, insts)))
    }

    /// Source blocks for the function at symbol `id`.
    pub fn source_view(&self, id: SymbolId, insts: Option<&[Instruction]>) -> Result<SourceView> {
        let debug = self
            .debug
            .as_ref()
            .ok_or_else(|| ObjError::MissingDebugInfo("file has no DWARF".into()))?;
        let sym = self.symbol(id)?;
        let extent = Range::new(sym.address, sym.end())
            .ok_or_else(|| ObjError::NotFound(format!("code for symbol {}", sym.name)))?;

        let subprogram = debug.subprogram_at(sym.address)?;
        let ranges = match &subprogram {
            Some(sp) if !sp.ranges.is_empty() => sp.ranges.clone(),
            _ => vec![extent],
        };
        let mut rows = Vec::new();
        for range in ranges {
            rows.extend(debug.line_rows(range)?);
        }

        let cfg = &self.config.source;
        let plans = plan_blocks(&rows, u64::from(cfg.context_lines), u64::from(cfg.merge_slack));
        let function = subprogram
            .and_then(|sp| sp.name)
            .unwrap_or_else(|| sym.name.clone());
        debug!(symbol = %sym.name, rows = rows.len(), blocks = plans.len(), "Planned source blocks");
        Ok(source::source_view(
            plans,
            &self.lines,
            cfg.root.as_deref(),
            Some(function.as_str()),
            insts,
        ))
    }

    /// Answers one query. Failures come back as [`ViewResponse::Error`].
    pub fn query(&self, request: &QueryRequest) -> ViewResponse {
        let span = info_span!("query", view = request.name());
        let _enter = span.enter();
        match self.run(request) {
            Ok(response) => response,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "Query failed");
                err.into()
            }
        }
    }

    fn run(&self, request: &QueryRequest) -> Result<ViewResponse> {
        Ok(match request {
            QueryRequest::Symbols => ViewResponse::Symbols(symbols::symbols_view(&self.index)),
            QueryRequest::Hex { symbol } => {
                let id = self.resolve(symbol)?;
                let data = formats::symbol_data(self.container(), id)?;
                ViewResponse::Hex(hex::hex_view(&data, &self.index))
            }
            QueryRequest::Asm {
                symbol,
                instructions,
            } => {
                let id = self.resolve(symbol)?;
                let live = match self.liveness_view(id, instructions) {
                    Ok(view) => view,
                    Err(err) => {
                        debug!(error = %err, "Disassembly without liveness");
                        None
                    }
                };
                ViewResponse::Asm(asm::asm_view(instructions.clone(), &self.index, live))
            }
            QueryRequest::Liveness {
                symbol,
                instructions,
            } => {
                let id = self.resolve(symbol)?;
                ViewResponse::Liveness(self.liveness_view(id, instructions)?)
            }
            QueryRequest::Source {
                symbol,
                instructions,
            } => {
                let id = self.resolve(symbol)?;
                ViewResponse::Source(self.source_view(id, instructions.as_deref())?)
            }
            QueryRequest::Highlight {
                instructions,
                ranges,
            } => ViewResponse::Highlight(asm::highlight(instructions, &ranges_from_pairs(ranges))),
        })
    }
}

/// Index constants from DWARF, falling back to `defaults` per field.
fn runtime_indices(debug: Option<&DebugInfo>, defaults: RuntimeIndices) -> RuntimeIndices {
    let Some(debug) = debug else {
        return defaults;
    };
    let consts = match debug.runtime_constants() {
        Ok(consts) => consts,
        Err(err) => {
            warn!(error = %err, "Cannot read runtime constants; using defaults");
            return defaults;
        }
    };
    let pick = |name: &str, default: u32| {
        consts
            .get(name)
            .and_then(|&v| u32::try_from(v).ok())
            .unwrap_or(default)
    };
    let indices = RuntimeIndices {
        stack_map: pick("_PCDATA_StackMapIndex", defaults.stack_map),
        args_pointer_maps: pick("_FUNCDATA_ArgsPointerMaps", defaults.args_pointer_maps),
        locals_pointer_maps: pick("_FUNCDATA_LocalsPointerMaps", defaults.locals_pointer_maps),
    };
    debug!(?indices, from_dwarf = consts.len(), "Runtime indices");
    indices
}

/// Bytes of the function table: the first configured section present, else
/// the configured symbol's data.
fn functab_bytes(container: &dyn Container, index: &SymbolIndex, cfg: &FunctabConfig) -> Option<Bytes> {
    for name in &cfg.section_names {
        if let Some(section) = container.sections().iter().find(|s| &s.name == name) {
            let bytes = container.section_bytes(section.index);
            if !bytes.is_empty() {
                debug!(section = %name, size = bytes.len(), "Found function table section");
                return Some(Bytes::copy_from_slice(bytes));
            }
        }
    }
    let id = index.by_name(&cfg.symbol_name)?;
    match formats::symbol_data(container, id) {
        Ok(data) if !data.bytes.is_empty() => {
            debug!(symbol = %cfg.symbol_name, size = data.bytes.len(), "Found function table symbol");
            Some(Bytes::from(data.bytes))
        }
        Ok(_) => None,
        Err(err) => {
            warn!(symbol = %cfg.symbol_name, error = %err, "Cannot read function table symbol");
            None
        }
    }
}

//! DWARF access for a loaded container.
//!
//! Only the queries the views need are implemented: address to compilation
//! unit and subprogram, line-table rows over a PC range, and the runtime's
//! `DW_TAG_constant` index values.

use crate::core::arch::Endianness;
use crate::core::range::Range;
use crate::error::{ObjError, Result};
use crate::formats::Container;
use gimli::{AttributeValue, Dwarf, EndianArcSlice, Reader, RunTimeEndian, SectionId, Unit};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

type DwarfReader = EndianArcSlice<RunTimeEndian>;

/// A subprogram (function) DIE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subprogram {
    pub name: Option<String>,
    pub ranges: Vec<Range>,
}

/// One line-table row span: instructions in `pcs` come from `path:line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRow {
    pub path: String,
    pub line: u64,
    pub pcs: Range,
}

/// Parsed DWARF with a sorted compilation-unit address index.
pub struct DebugInfo {
    dwarf: Dwarf<DwarfReader>,
    units: Vec<Unit<DwarfReader>>,
    /// `(range, unit index)`, sorted by range start.
    cu_ranges: Vec<(Range, usize)>,
}

impl std::fmt::Debug for DebugInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugInfo")
            .field("units", &self.units.len())
            .field("cu_ranges", &self.cu_ranges.len())
            .finish()
    }
}

impl DebugInfo {
    /// Loads DWARF from the container's debug sections.
    pub fn load(container: &dyn Container) -> Result<Self> {
        match container.debug_section(".debug_info") {
            Some(bytes) if !bytes.is_empty() => {}
            _ => return Err(ObjError::MissingDebugInfo("no .debug_info section".into())),
        }
        let endian = match container.endianness() {
            Endianness::Little => RunTimeEndian::Little,
            Endianness::Big => RunTimeEndian::Big,
        };
        let load = |id: SectionId| -> std::result::Result<DwarfReader, gimli::Error> {
            let data: Arc<[u8]> = container
                .debug_section(id.name())
                .map(Arc::from)
                .unwrap_or_else(|| Arc::from(Vec::new()));
            Ok(EndianArcSlice::new(data, endian))
        };
        let dwarf = Dwarf::load(load)?;

        let mut units = Vec::new();
        let mut cu_ranges = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers.next()? {
            let unit = dwarf.unit(header)?;
            let index = units.len();
            let mut ranges = dwarf.unit_ranges(&unit)?;
            while let Some(r) = ranges.next()? {
                if let Some(range) = Range::new(r.begin, r.end) {
                    cu_ranges.push((range, index));
                }
            }
            units.push(unit);
        }
        cu_ranges.sort_by_key(|(r, _)| r.start);

        debug!(units = units.len(), ranges = cu_ranges.len(), "Loaded DWARF");
        Ok(Self {
            dwarf,
            units,
            cu_ranges,
        })
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    fn unit_at(&self, addr: u64) -> Option<&Unit<DwarfReader>> {
        let i = self.cu_ranges.partition_point(|(r, _)| r.start <= addr);
        let (range, unit) = self.cu_ranges.get(i.checked_sub(1)?)?;
        range.contains(addr).then(|| &self.units[*unit])
    }

    /// The subprogram whose ranges contain `addr`.
    pub fn subprogram_at(&self, addr: u64) -> Result<Option<Subprogram>> {
        let Some(unit) = self.unit_at(addr) else {
            return Ok(None);
        };
        let mut cursor = unit.entries();
        while let Some((_, entry)) = cursor.next_dfs()? {
            if entry.tag() != gimli::DW_TAG_subprogram {
                continue;
            }
            let mut ranges = Vec::new();
            let mut iter = self.dwarf.die_ranges(unit, entry)?;
            while let Some(r) = iter.next()? {
                ranges.extend(Range::new(r.begin, r.end));
            }
            if ranges.iter().any(|r| r.contains(addr)) {
                let name = match entry.attr_value(gimli::DW_AT_name)? {
                    Some(value) => Some(self.attr_string(unit, value)?),
                    None => None,
                };
                return Ok(Some(Subprogram { name, ranges }));
            }
        }
        Ok(None)
    }

    /// Values of `runtime._PCDATA_*` and `runtime._FUNCDATA_*` constants,
    /// keyed by name without the `runtime.` prefix.
    pub fn runtime_constants(&self) -> Result<HashMap<String, i64>> {
        let mut out = HashMap::new();
        for unit in &self.units {
            let mut cursor = unit.entries();
            while let Some((_, entry)) = cursor.next_dfs()? {
                if entry.tag() != gimli::DW_TAG_constant {
                    continue;
                }
                let Some(name) = entry.attr_value(gimli::DW_AT_name)? else {
                    continue;
                };
                let name = self.attr_string(unit, name)?;
                let Some(short) = name.strip_prefix("runtime.") else {
                    continue;
                };
                if !(short.starts_with("_PCDATA_") || short.starts_with("_FUNCDATA_")) {
                    continue;
                }
                let value = entry
                    .attr_value(gimli::DW_AT_const_value)?
                    .and_then(|v| v.sdata_value().or_else(|| v.udata_value().map(|u| u as i64)));
                if let Some(value) = value {
                    out.insert(short.to_string(), value);
                }
            }
        }
        Ok(out)
    }

    /// Line-table spans overlapping `range`, in line-program order.
    pub fn line_rows(&self, range: Range) -> Result<Vec<LineRow>> {
        let Some(unit) = self.unit_at(range.start) else {
            return Err(ObjError::MissingDebugInfo(format!(
                "no compilation unit covers {:#x}",
                range.start
            )));
        };
        let Some(program) = unit.line_program.clone() else {
            return Err(ObjError::MissingDebugInfo("compilation unit has no line table".into()));
        };
        let comp_dir = match &unit.comp_dir {
            Some(dir) => PathBuf::from(dir.to_string_lossy()?.into_owned()),
            None => PathBuf::new(),
        };

        let mut paths: HashMap<u64, String> = HashMap::new();
        let mut pending: Option<(u64, String, u64)> = None;
        let mut out = Vec::new();
        let mut rows = program.rows();
        while let Some((header, row)) = rows.next_row()? {
            if let Some((start, path, line)) = pending.take() {
                if let Some(pcs) = Range::new(start, row.address()) {
                    if pcs.overlaps(&range) {
                        out.push(LineRow { path, line, pcs });
                    }
                }
            }
            if row.end_sequence() {
                continue;
            }
            let path = match paths.get(&row.file_index()) {
                Some(p) => p.clone(),
                None => {
                    let mut p = comp_dir.clone();
                    if let Some(file) = row.file(header) {
                        if let Some(dir) = file.directory(header) {
                            p.push(self.attr_string(unit, dir)?);
                        }
                        p.push(self.attr_string(unit, file.path_name())?);
                    }
                    let p = p.to_string_lossy().into_owned();
                    paths.insert(row.file_index(), p.clone());
                    p
                }
            };
            let line = row.line().map_or(0, |l| l.get());
            pending = Some((row.address(), path, line));
        }
        Ok(out)
    }

    fn attr_string(&self, unit: &Unit<DwarfReader>, value: AttributeValue<DwarfReader>) -> Result<String> {
        let reader = self.dwarf.attr_string(unit, value)?;
        Ok(reader.to_string_lossy()?.into_owned())
    }
}

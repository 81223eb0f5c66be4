use std::path::{Path, PathBuf};
use std::sync::Arc;

use mover_core::{PoolIndex, Relocation, MAX_SCRIPTS};
use rhai::{exported_module, Engine, OptimizationLevel, Scope, AST};

use crate::binding::host_fault;
use crate::host_plugin::host_rhai_plugin;
use crate::ScriptError;

enum ScriptSource<'a> {
    File(PathBuf),
    Text(&'a str),
}

/// One interpreter instance together with the script it was created for.
pub struct LoadedScript {
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    source_id: String,
}

impl LoadedScript {
    /// Compile the script and run its top-level code once.
    fn new(source_id: &str, source: ScriptSource) -> Result<Self, ScriptError> {
        let load_error = |message: String| ScriptError::Load {
            source_id: source_id.to_string(),
            message,
        };

        let engine = create_engine();
        let mut ast = match source {
            ScriptSource::File(path) => engine
                .compile_file(path)
                .map_err(|err| load_error(err.to_string()))?,
            ScriptSource::Text(text) => engine
                .compile(text)
                .map_err(|err| load_error(err.to_string()))?,
        };
        ast.set_source(source_id);

        let mut scope = Scope::new();
        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|err| match host_fault(&err) {
                Some(fault) => load_error(fault.to_string()),
                None => load_error(err.to_string()),
            })?;

        Ok(Self {
            engine,
            ast,
            scope,
            source_id: source_id.to_string(),
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Whether the script defines a zero-argument function called `name`.
    pub fn has_function(&self, name: &str) -> bool {
        self.ast
            .iter_functions()
            .any(|f| f.name == name && f.params.is_empty())
    }

    pub(crate) fn parts_mut(&mut self) -> (&Engine, &AST, &mut Scope<'static>) {
        (&self.engine, &self.ast, &mut self.scope)
    }
}

impl std::fmt::Debug for LoadedScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoadedScript({})", self.source_id)
    }
}

/// Fixed-capacity pool of loaded scripts.
///
/// Slots `0..len()` are always occupied; the rest are empty. Removal swaps the last
/// occupied slot into the hole, so indices past the removed one can change.
#[derive(Debug, Default)]
pub struct ScriptPool {
    slots: [Option<LoadedScript>; MAX_SCRIPTS],
    len: usize,
}

impl ScriptPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        MAX_SCRIPTS
    }

    /// Number of loaded scripts.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == MAX_SCRIPTS
    }

    /// The slot the next successful load will occupy.
    pub fn next_free(&self) -> Option<PoolIndex> {
        PoolIndex::from_usize(self.len)
    }

    /// Load a script from a file. The path, as given, becomes the script's source id.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<PoolIndex, ScriptError> {
        let path = path.as_ref();
        let source_id = path.to_string_lossy().to_string();
        self.insert(&source_id, ScriptSource::File(path.to_path_buf()))
    }

    /// Load a script from source text held in memory.
    pub fn load_source(&mut self, source_id: &str, source: &str) -> Result<PoolIndex, ScriptError> {
        self.insert(source_id, ScriptSource::Text(source))
    }

    fn insert(&mut self, source_id: &str, source: ScriptSource) -> Result<PoolIndex, ScriptError> {
        let Some(index) = self.next_free() else {
            log::error!("Script limit reached, not loading {}", source_id);
            return Err(ScriptError::CapacityExceeded {
                capacity: MAX_SCRIPTS,
            });
        };

        match LoadedScript::new(source_id, source) {
            Ok(script) => {
                self.slots[index.as_usize()] = Some(script);
                self.len += 1;
                log::info!("Script {} loaded at index {}", source_id, index);
                Ok(index)
            }
            Err(err) => {
                log::error!("Failed to load {}: {}", source_id, err);
                Err(err)
            }
        }
    }

    /// Drop the script at `index` and move the last loaded script into its slot.
    pub fn unload(&mut self, index: PoolIndex) -> Result<Relocation, ScriptError> {
        self.check_index(index)?;
        let last = self.len - 1;

        let removed = self.slots[index.as_usize()].take();
        let moved_from = if index.as_usize() != last {
            self.slots.swap(index.as_usize(), last);
            PoolIndex::from_usize(last)
        } else {
            None
        };
        self.len -= 1;

        if let Some(script) = removed {
            log::info!("Script {} unloaded from index {}", script.source_id, index);
        }
        Ok(Relocation {
            removed: index,
            moved_from,
        })
    }

    pub fn get_source_id(&self, index: PoolIndex) -> Result<&str, ScriptError> {
        self.get(index).map(LoadedScript::source_id)
    }

    pub fn get(&self, index: PoolIndex) -> Result<&LoadedScript, ScriptError> {
        self.check_index(index)?;
        self.slots[index.as_usize()]
            .as_ref()
            .ok_or(ScriptError::InvalidIndex {
                index,
                len: self.len,
            })
    }

    pub fn get_mut(&mut self, index: PoolIndex) -> Result<&mut LoadedScript, ScriptError> {
        self.check_index(index)?;
        let len = self.len;
        self.slots[index.as_usize()]
            .as_mut()
            .ok_or(ScriptError::InvalidIndex { index, len })
    }

    /// Iterate over loaded scripts in pool order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolIndex, &LoadedScript)> {
        self.slots[..self.len]
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((PoolIndex::from_usize(i)?, slot.as_ref()?)))
    }

    fn check_index(&self, index: PoolIndex) -> Result<(), ScriptError> {
        if index.as_usize() < self.len {
            Ok(())
        } else {
            Err(ScriptError::InvalidIndex {
                index,
                len: self.len,
            })
        }
    }
}

fn create_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_max_expr_depths(64, 64);
    engine.set_optimization_level(OptimizationLevel::Simple);

    engine.on_print(|text| log::info!("[RHAI SCRIPT] {}", text));

    engine.on_debug(|text, source, pos| {
        let src_info = source.map_or_else(String::new, |s| format!(" in '{}'", s));
        let pos_info = if pos.is_none() {
            String::new()
        } else {
            format!(" @ {}", pos)
        };
        log::debug!("[RHAI SCRIPT DEBUG]{}{}: {}", src_info, pos_info, text);
    });

    let host_module = Arc::new(exported_module!(host_rhai_plugin));
    engine.register_global_module(host_module);

    engine
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const NOOP: &str = "fn process() {}";

    #[test]
    fn test_load_assigns_consecutive_indices() {
        let mut pool = ScriptPool::new();
        assert!(pool.is_empty());
        for i in 0..MAX_SCRIPTS {
            let index = pool.load_source(&format!("s{i}"), NOOP).unwrap();
            assert_eq!(index.as_usize(), i);
        }
        assert!(pool.is_full());
        assert_eq!(pool.next_free(), None);
        assert_eq!(pool.get_source_id(PoolIndex::new(2)).unwrap(), "s2");
    }

    #[test_log::test]
    fn test_fifth_load_exceeds_capacity() {
        let mut pool = ScriptPool::new();
        for i in 0..MAX_SCRIPTS {
            pool.load_source(&format!("s{i}"), NOOP).unwrap();
        }
        let err = pool.load_source("one-too-many", NOOP).unwrap_err();
        assert_eq!(
            err,
            ScriptError::CapacityExceeded {
                capacity: MAX_SCRIPTS
            }
        );
        assert_eq!(pool.len(), MAX_SCRIPTS);
    }

    #[test_log::test]
    fn test_failed_load_commits_nothing() {
        let mut pool = ScriptPool::new();
        pool.load_source("good", NOOP).unwrap();

        let err = pool.load_source("syntax", "fn process( {").unwrap_err();
        assert!(matches!(err, ScriptError::Load { ref source_id, .. } if source_id == "syntax"));

        let err = pool
            .load_source("throws", "throw \"boom\"; fn process() {}")
            .unwrap_err();
        assert!(matches!(err, ScriptError::Load { ref source_id, .. } if source_id == "throws"));

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.next_free(), Some(PoolIndex::new(1)));
    }

    #[test]
    fn test_host_functions_unavailable_at_top_level() {
        let mut pool = ScriptPool::new();
        let err = pool
            .load_source("eager", "move(1.0, 1.0); fn process() {}")
            .unwrap_err();
        assert!(matches!(err, ScriptError::Load { .. }));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_top_level_host_call_inside_try_still_fails_to_load() {
        let mut pool = ScriptPool::new();
        let err = pool
            .load_source("guarded", "try { move(1.0, 1.0); } catch { } fn process() {}")
            .unwrap_err();
        assert!(
            matches!(err, ScriptError::Load { ref message, .. } if message.contains("no position binding"))
        );
        assert!(pool.is_empty());
    }

    #[test]
    fn test_load_from_file_uses_path_as_source_id() {
        let mut file = tempfile::Builder::new().suffix(".rhai").tempfile().unwrap();
        writeln!(file, "fn process() {{ move(1.0, 0.0); }}").unwrap();

        let mut pool = ScriptPool::new();
        let index = pool.load(file.path()).unwrap();
        assert_eq!(
            pool.get_source_id(index).unwrap(),
            file.path().to_string_lossy()
        );
        assert!(pool.get(index).unwrap().has_function("process"));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let mut pool = ScriptPool::new();
        let err = pool.load("does/not/exist.rhai").unwrap_err();
        assert!(matches!(err, ScriptError::Load { .. }));
    }

    #[test]
    fn test_invalid_index_lookups() {
        let mut pool = ScriptPool::new();
        assert!(matches!(
            pool.get_source_id(PoolIndex::new(0)),
            Err(ScriptError::InvalidIndex { len: 0, .. })
        ));
        pool.load_source("a", NOOP).unwrap();
        assert!(pool.get_source_id(PoolIndex::new(0)).is_ok());
        assert!(matches!(
            pool.unload(PoolIndex::new(1)),
            Err(ScriptError::InvalidIndex { len: 1, .. })
        ));
    }

    #[test]
    fn test_unload_swaps_last_valid_slot_for_every_size() {
        for size in 1..=MAX_SCRIPTS {
            for removed in 0..size {
                let mut pool = ScriptPool::new();
                for i in 0..size {
                    pool.load_source(&format!("s{i}"), NOOP).unwrap();
                }

                let relocation = pool.unload(PoolIndex::new(removed as u8)).unwrap();
                assert_eq!(pool.len(), size - 1);
                assert_eq!(relocation.removed.as_usize(), removed);

                if removed == size - 1 {
                    assert_eq!(relocation.moved_from, None);
                } else {
                    assert_eq!(relocation.moved_from, PoolIndex::from_usize(size - 1));
                    assert_eq!(
                        pool.get_source_id(PoolIndex::new(removed as u8)).unwrap(),
                        format!("s{}", size - 1)
                    );
                }

                // Everything else stays where it was.
                for i in (0..size - 1).filter(|i| *i != removed) {
                    assert_eq!(
                        pool.get_source_id(PoolIndex::new(i as u8)).unwrap(),
                        format!("s{i}")
                    );
                }
                let ids: Vec<_> = pool.iter().map(|(_, s)| s.source_id().to_string()).collect();
                assert_eq!(ids.len(), size - 1);
                assert!(!ids.contains(&format!("s{removed}")));
            }
        }
    }
}

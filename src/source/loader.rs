//! File pattern expansion, library tracking, and (optionally parallel)
//! loading and parsing of source files.

use std::collections::HashSet;
use std::path::PathBuf;
use std::thread;

use crate::driver::options::OptionBag;
use crate::error::Error;
use crate::syntax::parser::{self, SyntaxTree};
use crate::syntax::preprocessor::Preprocessor;

use super::{BufferId, SourceManager};

struct FileEntry {
    pattern: String,
    /// `Some` marks a library file; the name may be empty for the default
    /// library.
    library: Option<String>,
}

/// Collects file patterns and search configuration, then materializes
/// buffers or parsed trees on demand.
#[derive(Default)]
pub struct SourceLoader {
    entries: Vec<FileEntry>,
    search_dirs: Vec<PathBuf>,
    search_exts: Vec<String>,
    exclude_exts: HashSet<String>,
    errors: Vec<Error>,
}

impl SourceLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file path or glob pattern; expansion happens at load time.
    pub fn add_files(&mut self, pattern: &str) {
        self.entries.push(FileEntry {
            pattern: pattern.to_owned(),
            library: None,
        });
    }

    /// Record a library file pattern. Library files are independent
    /// compilation units whose modules are not auto-instantiated.
    pub fn add_library_files(&mut self, library: &str, pattern: &str) {
        self.entries.push(FileEntry {
            pattern: pattern.to_owned(),
            library: Some(library.to_owned()),
        });
    }

    pub fn add_search_directories(&mut self, dirs: impl IntoIterator<Item = PathBuf>) {
        self.search_dirs.extend(dirs);
    }

    pub fn add_search_extensions(&mut self, exts: impl IntoIterator<Item = String>) {
        for ext in exts {
            let ext = ext.trim_start_matches('.').to_owned();
            self.search_exts.push(ext);
        }
    }

    /// Extensions dropped when expanding positional patterns. Library files
    /// are deliberately exempt.
    pub fn set_exclude_extensions(&mut self, exts: HashSet<String>) {
        self.exclude_exts = exts;
    }

    #[must_use]
    pub fn has_files(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Load failures recorded by the latest load call, one per file.
    pub fn take_errors(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }

    /// Expand every pattern in recorded order.
    fn expand(&mut self) -> Vec<(PathBuf, Option<String>)> {
        let mut files = Vec::new();
        for entry in &self.entries {
            if entry.pattern.contains(['*', '?', '[']) {
                let mut matches = Vec::new();
                if let Ok(paths) = glob::glob(&entry.pattern) {
                    for path in paths.flatten() {
                        matches.push(path);
                    }
                }
                matches.sort();
                for path in matches {
                    if entry.library.is_none() && self.is_excluded(&path) {
                        continue;
                    }
                    files.push((path, entry.library.clone()));
                }
            } else {
                let path = PathBuf::from(&entry.pattern);
                if entry.library.is_none() && self.is_excluded(&path) {
                    continue;
                }
                files.push((path, entry.library.clone()));
            }
        }
        files
    }

    fn is_excluded(&self, path: &std::path::Path) -> bool {
        if self.exclude_exts.is_empty() {
            return false;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| self.exclude_exts.contains(ext))
    }

    /// Load every recorded file into the source manager, in input order.
    pub fn load_sources(&mut self, sm: &SourceManager) -> Vec<BufferId> {
        let files = self.expand();
        let mut buffers = Vec::new();
        for (path, library) in files {
            match sm.read_file(&path, library) {
                Ok(id) => buffers.push(id),
                Err(err) => self.errors.push(Error::load(path, err)),
            }
        }
        buffers
    }

    /// Load and parse everything. In single-unit mode the non-library files
    /// form one tree; otherwise each file parses independently, fanning out
    /// across worker threads when the options ask for more than one. The
    /// returned tree order always matches the input order.
    pub fn load_and_parse_sources(&mut self, sm: &SourceManager, bag: &OptionBag) -> Vec<SyntaxTree> {
        let files = self.expand();
        let mut main_buffers = Vec::new();
        let mut library_buffers = Vec::new();
        for (path, library) in files {
            match sm.read_file(&path, library.clone()) {
                Ok(id) => match library {
                    Some(name) => library_buffers.push((id, name)),
                    None => main_buffers.push(id),
                },
                Err(err) => self.errors.push(Error::load(path, err)),
            }
        }

        let mut trees = Vec::new();
        let mut inherited_macros = None;

        if bag.source.single_unit {
            let mut pp = Preprocessor::new(sm, bag.lexer.clone(), bag.preprocessor.clone());
            for &id in main_buffers.iter().rev() {
                pp.push_source(id);
            }
            let (tokens, diagnostics, pragmas) = parser::drain(&mut pp);
            if bag.source.libraries_inherit_macros {
                inherited_macros = Some(pp.macro_snapshot());
            }
            trees.push(parser::parse_tokens(
                tokens,
                diagnostics,
                pragmas,
                &bag.parser,
                main_buffers.clone(),
            ));
        } else {
            trees.extend(self.parse_separate(sm, bag, &main_buffers));
        }

        for (id, library) in library_buffers {
            let mut pp = Preprocessor::new(sm, bag.lexer.clone(), bag.preprocessor.clone());
            if let Some((macros, order)) = &inherited_macros {
                pp.inherit_macros(macros.clone(), order.clone());
            }
            pp.push_source(id);
            let mut tree = parser::parse(pp, &bag.parser, vec![id]);
            tree.library = Some(library);
            trees.push(tree);
        }

        trees
    }

    /// One tree per buffer, parallelized across a scoped worker pool. Worker
    /// results land in their input slot so scheduling never affects order.
    fn parse_separate(
        &self,
        sm: &SourceManager,
        bag: &OptionBag,
        buffers: &[BufferId],
    ) -> Vec<SyntaxTree> {
        let workers = bag
            .source
            .num_threads
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(std::num::NonZeroUsize::get)
                    .unwrap_or(1)
            })
            .clamp(1, buffers.len().max(1));

        if workers <= 1 || buffers.len() <= 1 {
            return buffers
                .iter()
                .map(|&id| Self::parse_one(sm, bag, id))
                .collect();
        }

        let mut slots: Vec<Option<SyntaxTree>> = Vec::new();
        slots.resize_with(buffers.len(), || None);

        thread::scope(|scope| {
            let mut worker_slots: Vec<Vec<(usize, &mut Option<SyntaxTree>)>> =
                (0..workers).map(|_| Vec::new()).collect();
            for (position, slot) in slots.iter_mut().enumerate() {
                worker_slots[position % workers].push((position, slot));
            }

            for chunk in worker_slots {
                scope.spawn(move || {
                    for (position, slot) in chunk {
                        *slot = Some(Self::parse_one(sm, bag, buffers[position]));
                    }
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_default())
            .collect()
    }

    fn parse_one(sm: &SourceManager, bag: &OptionBag, id: BufferId) -> SyntaxTree {
        let mut pp = Preprocessor::new(sm, bag.lexer.clone(), bag.preprocessor.clone());
        pp.push_source(id);
        parser::parse(pp, &bag.parser, vec![id])
    }

    /// Look for a missing module definition in the library search path,
    /// trying `.v` and `.sv` plus any registered extensions.
    #[must_use]
    pub fn find_module_file(&self, name: &str) -> Option<PathBuf> {
        let mut extensions: Vec<&str> = vec!["v", "sv"];
        extensions.extend(self.search_exts.iter().map(String::as_str));
        for dir in &self.search_dirs {
            for ext in &extensions {
                let candidate = dir.join(format!("{name}.{ext}"));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

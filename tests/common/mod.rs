//! Shared fixtures for integration tests.
//!
//! - `pmem_index`: a small in-memory index modelled on a C++ library's docs
//! - `docs_dir`: a temporary directory holding generated search tables

use rstest::fixture;
use std::path::Path;
use std::sync::Arc;
use symdex::{Index, Record, SymbolKind};
use tempfile::TempDir;

/// `functions_0.js` for the `docs_dir` fixture. Two overloads of `append`.
pub const FUNCTIONS_TABLE: &str = r"var searchData=
[
  ['append_0',['append',['../classpmem_1_1obj_1_1basic__string.html#a6a55',1,'pmem::obj::basic_string::append(size_type count, CharT ch)'],['../classpmem_1_1obj_1_1basic__string.html#a7b66',1,'pmem::obj::basic_string::append(const basic_string &amp;str)']]],
  ['at_1',['at',['../structpmem_1_1obj_1_1array.html#a1c2d',1,'pmem::obj::array::at(size_type n)']]],
  ['make_5fpersistent_2',['make_persistent',['../namespacepmem_1_1obj.html#a9e8f',1,'pmem::obj::make_persistent(allocation_flag flag, Args &amp;&amp;... args)']]]
];
";

/// `classes_0.js` for the `docs_dir` fixture.
pub const CLASSES_TABLE: &str = r"var searchData=
[
  ['array_0',['array',['../structpmem_1_1obj_1_1array.html',1,'pmem::obj']]],
  ['basic_5fstring_1',['basic_string',['../classpmem_1_1obj_1_1basic__string.html',1,'pmem::obj']]],
  ['mutex_2',['mutex',['../classpmem_1_1obj_1_1mutex.html',1,'pmem::obj']]]
];
";

/// `all_0.js` for the `docs_dir` fixture; repeats targets from the category tables.
pub const ALL_TABLE: &str = r"var searchData=
[
  ['at_0',['at',['../structpmem_1_1obj_1_1array.html#a1c2d',1,'pmem::obj::array::at(size_type n)']]],
  ['mutex_1',['mutex',['../classpmem_1_1obj_1_1mutex.html',1,'pmem::obj']]],
  ['pmem_2',['pmem',['../namespacepmem.html',1,'']]]
];
";

#[allow(dead_code)] // Fixtures used across different integration test crates
#[fixture]
pub fn pmem_index() -> Arc<Index> {
    let build = Index::build(vec![
        Record::new(1, "append", &["basic_string"], "s.html#a1", SymbolKind::Function),
        Record::new(2, "at", &["array"], "a.html#a2", SymbolKind::Function),
        Record::new(3, "mutex", &["pmem", "obj"], "m.html", SymbolKind::Type),
        Record::new(4, "mutex_base", &["pmem", "detail"], "mb.html", SymbolKind::Type),
        Record::new(5, "shared_mutex", &["pmem", "obj"], "sm.html", SymbolKind::Type),
        Record::new(6, "Mutex", &["legacy"], "lm.html", SymbolKind::Type),
        Record::new(7, "make_persistent", &["pmem", "obj"], "mp.html", SymbolKind::Function),
        Record::new(8, "_lock", &["pmem", "obj", "mutex"], "m.html#l", SymbolKind::Variable),
        Record::new(9, "3way", &[], "w.html", SymbolKind::Page),
    ]);
    assert!(build.rejected.is_empty());
    Arc::new(build.index)
}

/// A temporary directory of search tables, removed on drop.
#[allow(dead_code)]
pub struct DocsDir {
    _temp: TempDir,
}

#[allow(dead_code)]
impl DocsDir {
    pub fn new() -> Self {
        Self {
            _temp: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self._temp.path()
    }

    pub fn write_table(&self, name: &str, content: &str) {
        std::fs::write(self.path().join(name), content).expect("Failed to write table");
    }
}

#[allow(dead_code)]
#[fixture]
pub fn docs_dir() -> DocsDir {
    let dir = DocsDir::new();
    dir.write_table("functions_0.js", FUNCTIONS_TABLE);
    dir.write_table("classes_0.js", CLASSES_TABLE);
    dir.write_table("all_0.js", ALL_TABLE);
    dir.write_table("search.js", "function SearchBox() {}\n");
    dir
}

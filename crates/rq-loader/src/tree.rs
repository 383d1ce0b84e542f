//! Dependency tree display.
//!
//! Formats the declared dependency graph of registered modules as an ASCII
//! tree:
//! ```text
//! app [ready]
//! ├── router [ready]
//! │   └── util [ready]
//! └── view [defined]
//!     └── util (shared)
//! ```

use std::collections::HashSet;

use crate::loader::Loader;
use crate::record::ModuleValue;

/// Format the dependency tree rooted at `root`.
///
/// Modules already printed are marked `(shared)` and not expanded again;
/// an edge back to a module on the current path is marked `(cycle)`.
pub fn format_tree<V: ModuleValue>(loader: &Loader<V>, root: &str) -> String {
    let mut out = format!("{root} [{}]\n", status_label(loader, root));
    let mut seen = HashSet::from([root.to_string()]);
    let mut path = vec![root.to_string()];

    let deps = loader.dependencies(root).unwrap_or_default();
    let count = deps.len();
    for (i, dep) in deps.iter().enumerate() {
        format_dep(loader, &mut out, dep, "", i == count - 1, &mut seen, &mut path);
    }

    out.push_str(&format!("\n{} modules\n", seen.len()));
    out
}

fn format_dep<V: ModuleValue>(
    loader: &Loader<V>,
    out: &mut String,
    id: &str,
    prefix: &str,
    is_last: bool,
    seen: &mut HashSet<String>,
    path: &mut Vec<String>,
) {
    let connector = if is_last { "└── " } else { "├── " };

    if path.iter().any(|p| p == id) {
        out.push_str(&format!("{prefix}{connector}{id} (cycle)\n"));
        return;
    }
    if !seen.insert(id.to_string()) {
        out.push_str(&format!("{prefix}{connector}{id} (shared)\n"));
        return;
    }

    out.push_str(&format!(
        "{prefix}{connector}{id} [{}]\n",
        status_label(loader, id)
    ));

    let child_prefix = if is_last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };

    let deps = loader.dependencies(id).unwrap_or_default();
    let child_count = deps.len();
    path.push(id.to_string());
    for (i, child) in deps.iter().enumerate() {
        format_dep(loader, out, child, &child_prefix, i == child_count - 1, seen, path);
    }
    path.pop();
}

fn status_label<V: ModuleValue>(loader: &Loader<V>, id: &str) -> String {
    loader
        .status(id)
        .map(|status| status.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

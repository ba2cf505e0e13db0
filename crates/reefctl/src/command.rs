//! The command tree: named commands, parameters, callbacks, and version
//! coexistence.
//!
//! The tree is built once at startup (generator output plus override
//! rewrites) and is read-only while a command runs. The process handles
//! exactly one invocation, single-threaded, so nodes are
//! `Rc<RefCell<Command>>`: cheap to alias, and aliasing is load-bearing —
//! [`CommandTree::merge_current`] exposes the current version's subtree at
//! the root *by sharing nodes*, so an override applied through either path
//! is visible through both.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::CliError;
use crate::param::Parameter;
use crate::shim::Invocation;

/// The function invoked with the bound parameter values.
pub type Callback = Rc<dyn Fn(&mut Invocation) -> Result<Value, CliError>>;

/// A shared, interior-mutable command node.
pub type CommandNode = Rc<RefCell<Command>>;

/// A named command: parameters, an optional callback, and child commands.
pub struct Command {
    /// Command name, unique among its siblings.
    pub name: String,
    /// One-line help text.
    pub help: String,
    /// Parameters in display order.
    pub parameters: Vec<Parameter>,
    /// Invocation callback; `None` for pure groups.
    pub callback: Option<Callback>,
    /// Child commands by name. Insertion overwrites, so collisions resolve
    /// last-write-wins in registration order.
    pub children: BTreeMap<String, CommandNode>,
}

impl Command {
    /// Create an empty command.
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            parameters: Vec::new(),
            callback: None,
            children: BTreeMap::new(),
        }
    }

    /// Wrap the command into a shared node.
    #[must_use]
    pub fn into_node(self) -> CommandNode {
        Rc::new(RefCell::new(self))
    }

    /// Find a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Children that are sub-namespaces (have children of their own).
    #[must_use]
    pub fn groups(&self) -> Vec<(String, CommandNode)> {
        self.children
            .iter()
            .filter(|(_, node)| !node.borrow().children.is_empty())
            .map(|(name, node)| (name.clone(), Rc::clone(node)))
            .collect()
    }

    /// Children that are invocable leaf commands.
    #[must_use]
    pub fn commands(&self) -> Vec<(String, CommandNode)> {
        self.children
            .iter()
            .filter(|(_, node)| node.borrow().children.is_empty())
            .map(|(name, node)| (name.clone(), Rc::clone(node)))
            .collect()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("callback", &self.callback.as_ref().map(|_| "…"))
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// How the current version's subtree is exposed at the service root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Commands are reachable only through their explicit version tag.
    ExplicitOnly,
    /// The current version's entries are aliased at the root; explicit
    /// version tags stay reachable. This is the production mode.
    #[default]
    Merged,
    /// The root *becomes* the current version's subtree and explicit
    /// version access is removed. A configuration switch only; never used
    /// in normal operation.
    Replaced,
}

/// A service's command tree plus its version index.
pub struct CommandTree {
    root: CommandNode,
    current: String,
}

impl CommandTree {
    /// Wrap a service root command. Version tags are the root's children
    /// until [`merge_current`](Self::merge_current) runs.
    pub fn new(root: CommandNode, current: impl Into<String>) -> Self {
        Self {
            root,
            current: current.into(),
        }
    }

    /// The service root node.
    #[must_use]
    pub fn root(&self) -> CommandNode {
        Rc::clone(&self.root)
    }

    /// The service (root command) name.
    #[must_use]
    pub fn name(&self) -> String {
        self.root.borrow().name.clone()
    }

    /// The version tag designated current.
    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current
    }

    /// Resolve a path of command names from the root. An empty path
    /// resolves to the root itself.
    pub fn lookup(&self, path: &[&str]) -> Result<CommandNode, CliError> {
        let mut node = Rc::clone(&self.root);
        for segment in path {
            let child = node.borrow().children.get(*segment).map(Rc::clone);
            node = child.ok_or_else(|| CliError::not_found(path, segment))?;
        }
        Ok(node)
    }

    /// Atomically swap the command at `path` for `node`; the old command
    /// and its subtree are discarded.
    pub fn replace(&self, path: &[&str], node: CommandNode) -> Result<(), CliError> {
        let (parent, name) = self.parent_of(path)?;
        let mut parent = parent.borrow_mut();
        if !parent.children.contains_key(name) {
            return Err(CliError::not_found(path, name));
        }
        parent.children.insert(name.to_string(), node);
        Ok(())
    }

    /// Insert a new command under the group at `path`.
    pub fn insert(&self, path: &[&str], node: CommandNode) -> Result<(), CliError> {
        let parent = self.lookup(path)?;
        let name = node.borrow().name.clone();
        parent.borrow_mut().children.insert(name, node);
        Ok(())
    }

    /// Remove the command (and its subtree) at `path`. Used to hide
    /// machine-only operations from the user-facing surface.
    pub fn delete(&self, path: &[&str]) -> Result<(), CliError> {
        let (parent, name) = self.parent_of(path)?;
        parent
            .borrow_mut()
            .children
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CliError::not_found(path, name))
    }

    /// Expose the current version's subtree at the root according to
    /// `policy`. Under [`MergePolicy::Merged`] every top-level entry of the
    /// current subtree is aliased (shared node, not a copy) at the root;
    /// root collisions are last-write-wins in registration order, and the
    /// explicitly versioned subtrees remain reachable.
    pub fn merge_current(&self, policy: MergePolicy) -> Result<(), CliError> {
        let current = self.lookup(&[&self.current]).map_err(|_| {
            CliError::spec_mismatch(
                &[&self.name()],
                format!("current version '{}' has no subtree", self.current),
            )
        })?;
        let entries: Vec<(String, CommandNode)> = current
            .borrow()
            .children
            .iter()
            .map(|(name, node)| (name.clone(), Rc::clone(node)))
            .collect();
        match policy {
            MergePolicy::ExplicitOnly => {}
            MergePolicy::Merged => {
                let mut root = self.root.borrow_mut();
                for (name, node) in entries {
                    root.children.insert(name, node);
                }
            }
            MergePolicy::Replaced => {
                let mut root = self.root.borrow_mut();
                root.children.clear();
                for (name, node) in entries {
                    root.children.insert(name, node);
                }
            }
        }
        Ok(())
    }

    fn parent_of<'a>(&self, path: &[&'a str]) -> Result<(CommandNode, &'a str), CliError> {
        let (name, parents) = path
            .split_last()
            .ok_or_else(|| CliError::spec_mismatch(path, "empty command path"))?;
        Ok((self.lookup(parents)?, name))
    }
}

impl fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("root", &self.root.borrow().name)
            .field("current", &self.current)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// svc ── v1 ── things ── {list, update}
    ///     └─ v2 ── things ── {list}
    fn sample_tree() -> CommandTree {
        let mut root = Command::new("svc", "Sample service");
        for (tag, ops) in [("v1", vec!["list", "update"]), ("v2", vec!["list"])] {
            let mut version = Command::new(tag, "");
            let mut things = Command::new("things", "");
            for op in ops {
                things
                    .children
                    .insert(op.to_string(), Command::new(op, "").into_node());
            }
            version
                .children
                .insert("things".to_string(), things.into_node());
            root.children.insert(tag.to_string(), version.into_node());
        }
        CommandTree::new(root.into_node(), "v2")
    }

    #[test]
    fn lookup_resolves_nested_paths() {
        let tree = sample_tree();
        let node = tree.lookup(&["v1", "things", "update"]).unwrap();
        assert_eq!(node.borrow().name, "update");
    }

    #[test]
    fn lookup_of_missing_segment_is_spec_mismatch() {
        let tree = sample_tree();
        let err = tree.lookup(&["v1", "things", "destroy"]).unwrap_err();
        assert!(matches!(err, CliError::SpecMismatch { .. }));
        assert!(err.to_string().contains("destroy"));
    }

    #[test]
    fn delete_removes_subtree() {
        let tree = sample_tree();
        tree.delete(&["v1", "things", "update"]).unwrap();
        assert!(tree.lookup(&["v1", "things", "update"]).is_err());
        assert!(tree.lookup(&["v1", "things", "list"]).is_ok());
    }

    #[test]
    fn delete_of_missing_command_fails() {
        let tree = sample_tree();
        assert!(tree.delete(&["v1", "things", "destroy"]).is_err());
    }

    #[test]
    fn replace_swaps_node() {
        let tree = sample_tree();
        let replacement = Command::new("list", "replaced").into_node();
        tree.replace(&["v2", "things", "list"], Rc::clone(&replacement))
            .unwrap();
        let found = tree.lookup(&["v2", "things", "list"]).unwrap();
        assert!(Rc::ptr_eq(&found, &replacement));
    }

    #[test]
    fn merged_policy_aliases_current_version_nodes() {
        let tree = sample_tree();
        tree.merge_current(MergePolicy::Merged).unwrap();
        let bare = tree.lookup(&["things"]).unwrap();
        let explicit = tree.lookup(&["v2", "things"]).unwrap();
        // Shared structure: the same node, not a copy.
        assert!(Rc::ptr_eq(&bare, &explicit));
        // Other explicit versions stay independently reachable.
        assert!(tree.lookup(&["v1", "things", "update"]).is_ok());
    }

    #[test]
    fn merged_policy_mutation_visible_through_both_paths() {
        let tree = sample_tree();
        tree.merge_current(MergePolicy::Merged).unwrap();
        tree.insert(
            &["v2", "things"],
            Command::new("updatemany", "").into_node(),
        )
        .unwrap();
        assert!(tree.lookup(&["things", "updatemany"]).is_ok());
    }

    #[test]
    fn explicit_only_policy_leaves_root_untouched() {
        let tree = sample_tree();
        tree.merge_current(MergePolicy::ExplicitOnly).unwrap();
        assert!(tree.lookup(&["things"]).is_err());
        assert!(tree.lookup(&["v2", "things"]).is_ok());
    }

    #[test]
    fn replaced_policy_removes_explicit_version_access() {
        let tree = sample_tree();
        tree.merge_current(MergePolicy::Replaced).unwrap();
        assert!(tree.lookup(&["things"]).is_ok());
        assert!(tree.lookup(&["v2"]).is_err());
        assert!(tree.lookup(&["v1"]).is_err());
    }

    #[test]
    fn groups_and_commands_partition_children() {
        let tree = sample_tree();
        tree.merge_current(MergePolicy::Merged).unwrap();
        let root = tree.root();
        let root = root.borrow();
        let groups: Vec<_> = root.groups().into_iter().map(|(n, _)| n).collect();
        assert!(groups.contains(&"things".to_string()));
        assert!(groups.contains(&"v1".to_string()));
        assert!(root.commands().is_empty());
    }

    #[test]
    fn merge_with_missing_current_version_fails() {
        let root = Command::new("svc", "").into_node();
        let tree = CommandTree::new(root, "v9");
        assert!(tree.merge_current(MergePolicy::Merged).is_err());
    }
}

use std::ops::{Index, IndexMut};

use crate::config::MAX_NAME_LEN;
use crate::error::{Result, VfsError};
use crate::io::BlockNumber;

use log::info;

const ROOT_NAME: &str = "/";
const PARENT_TOKEN: &str = "..";

/// Handle to a node slot in a `Tree`. Handles are only meaningful for the tree
/// that issued them and go stale once the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
  File,
  Directory,
}

/// The blocks owned by a file, in content order, and the exact number of bytes
/// stored across them. Only the final block may be partially used.
#[derive(Debug, Default)]
pub struct FileData {
  pub(crate) blocks: Vec<BlockNumber>,
  pub(crate) len: usize,
}

impl FileData {
  pub fn blocks(&self) -> &[BlockNumber] {
    &self.blocks
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

/// Children of a directory form a ring. The ring is stored flat with `start`
/// marking the slot enumeration begins from; walking past the end wraps to 0.
#[derive(Debug, Default)]
pub struct DirData {
  children: Vec<NodeId>,
  start: usize,
}

impl DirData {
  pub fn len(&self) -> usize {
    self.children.len()
  }

  pub fn is_empty(&self) -> bool {
    self.children.is_empty()
  }

  fn insert_at_start(&mut self, id: NodeId) {
    // `start` keeps pointing at the same slot, which now holds `id`.
    self.children.insert(self.start, id);
  }

  fn remove(&mut self, id: NodeId) -> bool {
    let pos = match self.children.iter().position(|&c| c == id) {
      Some(pos) => pos,
      None => return false,
    };
    self.children.remove(pos);

    if self.children.is_empty() {
      self.start = 0;
    } else if pos < self.start {
      self.start -= 1;
    } else if self.start >= self.children.len() {
      // The removed child was the start point and sat last in storage; its
      // next sibling is the first slot.
      self.start = 0;
    }
    true
  }
}

#[derive(Debug)]
enum Content {
  File(FileData),
  Directory(DirData),
}

#[derive(Debug)]
pub struct Node {
  name: String,
  /// Back reference only; the tree owns every node.
  parent: Option<NodeId>,
  content: Content,
}

impl Node {
  fn new(name: &str, kind: Kind) -> Self {
    let content = match kind {
      Kind::File => Content::File(FileData::default()),
      Kind::Directory => Content::Directory(DirData::default()),
    };
    Self {
      name: name.to_owned(),
      parent: None,
      content,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  pub fn kind(&self) -> Kind {
    match self.content {
      Content::File(_) => Kind::File,
      Content::Directory(_) => Kind::Directory,
    }
  }

  pub fn is_dir(&self) -> bool {
    self.kind() == Kind::Directory
  }

  pub fn as_file(&self) -> Option<&FileData> {
    match &self.content {
      Content::File(file) => Some(file),
      Content::Directory(_) => None,
    }
  }

  pub fn as_file_mut(&mut self) -> Option<&mut FileData> {
    match &mut self.content {
      Content::File(file) => Some(file),
      Content::Directory(_) => None,
    }
  }

  pub fn as_dir(&self) -> Option<&DirData> {
    match &self.content {
      Content::Directory(dir) => Some(dir),
      Content::File(_) => None,
    }
  }

  fn as_dir_mut(&mut self) -> Option<&mut DirData> {
    match &mut self.content {
      Content::Directory(dir) => Some(dir),
      Content::File(_) => None,
    }
  }

  /// Number of children; always 0 for files.
  pub fn child_count(&self) -> usize {
    self.as_dir().map_or(0, DirData::len)
  }
}

/// Checks a name is storable as a single path segment.
fn validate_name(name: &str) -> Result<()> {
  let reason = if name.is_empty() {
    "name cannot be empty"
  } else if name.chars().count() > MAX_NAME_LEN {
    "name is longer than 50 characters"
  } else if name.contains('/') {
    "name cannot contain '/'"
  } else if name == "." || name == PARENT_TOKEN {
    "name is reserved"
  } else {
    return Ok(());
  };

  Err(VfsError::InvalidName {
    name: name.to_owned(),
    reason,
  })
}

/// Arena of every node reachable from the root. Slots freed by `remove` are
/// reused by later insertions.
#[derive(Debug)]
pub struct Tree {
  slots: Vec<Option<Node>>,
  vacant: Vec<usize>,
  root: NodeId,
}

impl Default for Tree {
  fn default() -> Self {
    Self::new()
  }
}

impl Tree {
  pub fn new() -> Self {
    Self {
      slots: vec![Some(Node::new(ROOT_NAME, Kind::Directory))],
      vacant: Vec::new(),
      root: NodeId(0),
    }
  }

  pub fn root(&self) -> NodeId {
    self.root
  }

  pub fn get(&self, id: NodeId) -> Option<&Node> {
    self.slots.get(id.0).and_then(Option::as_ref)
  }

  /// The number of live nodes, root included.
  pub fn total_nodes(&self) -> usize {
    self.slots.len() - self.vacant.len()
  }

  fn alloc(&mut self, node: Node) -> NodeId {
    match self.vacant.pop() {
      Some(slot) => {
        self.slots[slot] = Some(node);
        NodeId(slot)
      }
      None => {
        self.slots.push(Some(node));
        NodeId(self.slots.len() - 1)
      }
    }
  }

  /// Creates `name` under `parent`, making it the first child enumerated.
  pub fn create_child(&mut self, parent: NodeId, name: &str, kind: Kind) -> Result<NodeId> {
    validate_name(name)?;
    if !self[parent].is_dir() {
      return Err(VfsError::NotADirectory(self[parent].name.clone()));
    }
    if self.find_child(parent, name).is_ok() {
      return Err(VfsError::AlreadyExists(name.to_owned()));
    }

    let mut node = Node::new(name, kind);
    node.parent = Some(parent);
    let id = self.alloc(node);
    if let Some(dir) = self[parent].as_dir_mut() {
      dir.insert_at_start(id);
    }
    info!("created {:?} '{}'", kind, name);
    Ok(id)
  }

  /// Lists exactly `child_count` children of `parent`, beginning at the ring's
  /// start point. Yields nothing for files and empty directories.
  pub fn children(&self, parent: NodeId) -> Children<'_> {
    let (ring, start) = match self[parent].as_dir() {
      Some(dir) => (dir.children.as_slice(), dir.start),
      None => (&[][..], 0),
    };
    Children {
      ring,
      start,
      taken: 0,
    }
  }

  /// Exact, case-sensitive lookup among the direct children of `parent`.
  pub fn find_child(&self, parent: NodeId, name: &str) -> Result<NodeId> {
    self
      .children(parent)
      .find(|&child| self[child].name == name)
      .ok_or_else(|| VfsError::NotFound(name.to_owned()))
  }

  /// Unlinks `child` from the ring of `parent` and clears its back reference.
  /// The child's own subtree and storage are left as they are.
  pub fn detach(&mut self, parent: NodeId, child: NodeId) {
    let unlinked = self[parent]
      .as_dir_mut()
      .map_or(false, |dir| dir.remove(child));
    if unlinked {
      self[child].parent = None;
    }
  }

  /// Frees the slot of a detached node and hands the node back. Children of
  /// `id` are not touched; callers remove subtrees bottom up.
  pub fn remove(&mut self, id: NodeId) -> Option<Node> {
    let node = self.slots.get_mut(id.0)?.take()?;
    self.vacant.push(id.0);
    Some(node)
  }

  /// Resolves a single navigation token relative to `current`.
  pub fn resolve(&self, current: NodeId, token: &str) -> Result<NodeId> {
    match token {
      ROOT_NAME => Ok(self.root),
      PARENT_TOKEN => Ok(self[current].parent.unwrap_or(current)),
      name => {
        let id = self.find_child(current, name)?;
        if !self[id].is_dir() {
          return Err(VfsError::NotADirectory(name.to_owned()));
        }
        Ok(id)
      }
    }
  }

  /// Renders the absolute path of `id` by walking parents up to the root.
  pub fn path(&self, id: NodeId) -> String {
    let mut segments = Vec::new();
    let mut cursor = id;
    while let Some(parent) = self[cursor].parent {
      segments.push(self[cursor].name.as_str());
      cursor = parent;
    }
    if segments.is_empty() {
      return ROOT_NAME.to_owned();
    }

    segments
      .iter()
      .rev()
      .fold(String::new(), |mut path, segment| {
        path.push('/');
        path.push_str(segment);
        path
      })
  }

  /// Every node in the subtree under `from`, children ahead of their parent.
  /// Walks with an explicit stack so depth is bounded by the heap, not the call
  /// stack.
  pub fn post_order(&self, from: NodeId) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut stack = vec![(from, false)];
    while let Some((id, expanded)) = stack.pop() {
      if expanded {
        order.push(id);
        continue;
      }
      stack.push((id, true));
      let children: Vec<NodeId> = self.children(id).collect();
      stack.extend(children.into_iter().rev().map(|child| (child, false)));
    }
    order
  }
}

impl Index<NodeId> for Tree {
  type Output = Node;

  fn index(&self, id: NodeId) -> &Node {
    match self.slots.get(id.0).and_then(Option::as_ref) {
      Some(node) => node,
      None => panic!("stale node handle {:?}", id),
    }
  }
}

impl IndexMut<NodeId> for Tree {
  fn index_mut(&mut self, id: NodeId) -> &mut Node {
    match self.slots.get_mut(id.0).and_then(Option::as_mut) {
      Some(node) => node,
      None => panic!("stale node handle {:?}", id),
    }
  }
}

/// Ring walk over the children of one directory, starting at its start point.
#[derive(Debug, Clone)]
pub struct Children<'a> {
  ring: &'a [NodeId],
  start: usize,
  taken: usize,
}

impl<'a> Iterator for Children<'a> {
  type Item = NodeId;

  fn next(&mut self) -> Option<Self::Item> {
    if self.taken == self.ring.len() {
      return None;
    }
    let id = self.ring[(self.start + self.taken) % self.ring.len()];
    self.taken += 1;
    Some(id)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let left = self.ring.len() - self.taken;
    (left, Some(left))
  }
}

impl<'a> ExactSizeIterator for Children<'a> {}

#[cfg(test)]
mod tests {
  use super::*;

  fn names(tree: &Tree, parent: NodeId) -> Vec<&str> {
    tree.children(parent).map(|id| tree[id].name()).collect()
  }

  #[test]
  fn new_tree_has_only_an_empty_root() {
    let tree = Tree::new();
    let root = tree.root();

    assert_eq!(tree.total_nodes(), 1);
    assert!(tree[root].is_dir());
    assert_eq!(tree[root].parent(), None);
    assert_eq!(tree.children(root).count(), 0);
  }

  #[test]
  fn newest_child_becomes_start_point() {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.create_child(root, "a", Kind::File).unwrap();
    tree.create_child(root, "b", Kind::File).unwrap();
    tree.create_child(root, "c", Kind::Directory).unwrap();

    assert_eq!(names(&tree, root), vec!["c", "b", "a"]);
    assert_eq!(tree[root].child_count(), 3);
  }

  #[test]
  fn duplicate_sibling_name_is_rejected() {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.create_child(root, "x", Kind::Directory).unwrap();

    match tree.create_child(root, "x", Kind::File).unwrap_err() {
      VfsError::AlreadyExists(name) => assert_eq!(name, "x"),
      err => panic!("unexpected error: {:?}", err),
    }
    assert_eq!(names(&tree, root), vec!["x"]);
  }

  #[test]
  fn names_are_case_sensitive() {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.create_child(root, "Notes", Kind::File).unwrap();
    tree.create_child(root, "notes", Kind::File).unwrap();

    assert!(tree.find_child(root, "NOTES").is_err());
    assert_eq!(tree.children(root).len(), 2);
  }

  #[test]
  fn same_name_allowed_under_different_parents() {
    let mut tree = Tree::new();
    let root = tree.root();
    let a = tree.create_child(root, "a", Kind::Directory).unwrap();
    tree.create_child(a, "a", Kind::Directory).unwrap();

    assert_eq!(tree.path(tree.find_child(a, "a").unwrap()), "/a/a");
  }

  #[test]
  fn invalid_names_are_rejected() {
    let mut tree = Tree::new();
    let root = tree.root();
    let long = "n".repeat(MAX_NAME_LEN + 1);

    for name in &["", ".", "..", "a/b", long.as_str()] {
      match tree.create_child(root, name, Kind::File).unwrap_err() {
        VfsError::InvalidName { .. } => (),
        err => panic!("unexpected error for {:?}: {:?}", name, err),
      }
    }
    tree
      .create_child(root, &"n".repeat(MAX_NAME_LEN), Kind::File)
      .unwrap();
  }

  #[test]
  fn cannot_create_child_under_file() {
    let mut tree = Tree::new();
    let root = tree.root();
    let file = tree.create_child(root, "f", Kind::File).unwrap();

    match tree.create_child(file, "g", Kind::File).unwrap_err() {
      VfsError::NotADirectory(_) => (),
      err => panic!("unexpected error: {:?}", err),
    }
  }

  #[test]
  fn find_child_does_not_descend() {
    let mut tree = Tree::new();
    let root = tree.root();
    let a = tree.create_child(root, "a", Kind::Directory).unwrap();
    tree.create_child(a, "deep", Kind::File).unwrap();

    assert!(tree.find_child(root, "deep").is_err());
    assert!(tree.find_child(a, "deep").is_ok());
  }

  #[test]
  fn detaching_start_point_advances_to_next_sibling() {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.create_child(root, "a", Kind::File).unwrap();
    tree.create_child(root, "b", Kind::File).unwrap();
    let c = tree.create_child(root, "c", Kind::File).unwrap();

    tree.detach(root, c);

    assert_eq!(names(&tree, root), vec!["b", "a"]);
    assert_eq!(tree[c].parent(), None);
  }

  #[test]
  fn ring_removal_moves_start_to_former_next_sibling() {
    let (a, b, c) = (NodeId(1), NodeId(2), NodeId(3));

    // Start point stored last: its next sibling wraps around to slot 0.
    let mut dir = DirData {
      children: vec![a, b, c],
      start: 2,
    };
    assert!(dir.remove(c));
    assert_eq!(dir.start, 0);
    assert_eq!(dir.children[dir.start], a);

    // Removing ahead of the start point shifts it without changing its child.
    let mut dir = DirData {
      children: vec![a, b, c],
      start: 2,
    };
    assert!(dir.remove(a));
    assert_eq!(dir.children[dir.start], c);

    assert!(!dir.remove(NodeId(9)));
  }

  #[test]
  fn detaching_middle_child_keeps_start_point() {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.create_child(root, "a", Kind::File).unwrap();
    let b = tree.create_child(root, "b", Kind::File).unwrap();
    tree.create_child(root, "c", Kind::File).unwrap();

    tree.detach(root, b);

    assert_eq!(names(&tree, root), vec!["c", "a"]);
  }

  #[test]
  fn detaching_only_child_empties_directory() {
    let mut tree = Tree::new();
    let root = tree.root();
    let only = tree.create_child(root, "only", Kind::Directory).unwrap();

    tree.detach(root, only);

    assert_eq!(tree[root].child_count(), 0);
    assert_eq!(tree.children(root).next(), None);
  }

  #[test]
  fn removed_slots_are_reused() {
    let mut tree = Tree::new();
    let root = tree.root();
    let gone = tree.create_child(root, "gone", Kind::File).unwrap();
    tree.detach(root, gone);
    let node = tree.remove(gone).unwrap();
    assert_eq!(node.name(), "gone");
    assert!(tree.get(gone).is_none());

    let fresh = tree.create_child(root, "fresh", Kind::File).unwrap();
    assert_eq!(fresh, gone);
    assert_eq!(tree.total_nodes(), 2);
  }

  #[test]
  fn listing_is_restartable() {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.create_child(root, "a", Kind::File).unwrap();
    tree.create_child(root, "b", Kind::File).unwrap();

    let first: Vec<_> = tree.children(root).collect();
    let second: Vec<_> = tree.children(root).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
  }

  #[test]
  fn resolves_navigation_tokens() {
    let mut tree = Tree::new();
    let root = tree.root();
    let a = tree.create_child(root, "a", Kind::Directory).unwrap();
    let b = tree.create_child(a, "b", Kind::Directory).unwrap();
    tree.create_child(b, "file", Kind::File).unwrap();

    assert_eq!(tree.resolve(b, "/").unwrap(), root);
    assert_eq!(tree.resolve(b, "..").unwrap(), a);
    assert_eq!(tree.resolve(root, "..").unwrap(), root);
    assert_eq!(tree.resolve(a, "b").unwrap(), b);

    match tree.resolve(b, "file").unwrap_err() {
      VfsError::NotADirectory(name) => assert_eq!(name, "file"),
      err => panic!("unexpected error: {:?}", err),
    }
    match tree.resolve(root, "missing").unwrap_err() {
      VfsError::NotFound(_) => (),
      err => panic!("unexpected error: {:?}", err),
    }
  }

  #[test]
  fn renders_absolute_paths() {
    let mut tree = Tree::new();
    let root = tree.root();
    let a = tree.create_child(root, "a", Kind::Directory).unwrap();
    let b = tree.create_child(a, "b", Kind::Directory).unwrap();

    assert_eq!(tree.path(root), "/");
    assert_eq!(tree.path(a), "/a");
    assert_eq!(tree.path(b), "/a/b");
  }

  #[test]
  fn post_order_visits_children_before_parents() {
    let mut tree = Tree::new();
    let root = tree.root();
    let a = tree.create_child(root, "a", Kind::Directory).unwrap();
    let inner = tree.create_child(a, "inner", Kind::File).unwrap();
    let b = tree.create_child(root, "b", Kind::File).unwrap();

    let order = tree.post_order(root);
    let pos = |id| order.iter().position(|&x| x == id).unwrap();

    assert_eq!(order.len(), 4);
    assert!(pos(inner) < pos(a));
    assert!(pos(a) < pos(root));
    assert!(pos(b) < pos(root));
    assert_eq!(*order.last().unwrap(), root);
  }

  #[test]
  fn post_order_handles_deep_chains() {
    let mut tree = Tree::new();
    let mut cursor = tree.root();
    for _ in 0..10_000 {
      cursor = tree.create_child(cursor, "d", Kind::Directory).unwrap();
    }

    let order = tree.post_order(tree.root());
    assert_eq!(order.len(), 10_001);
    assert_eq!(order[0], cursor);
  }
}

/*
Rendering lives in the CLI layer, so the display conversion is a trait
implemented here for types owned by the application and domain layers.
 */
use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::application::services::RankedThread;
use crate::domain::{DiscussionTree, Ranker, VoteDirection};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

fn node_line(tree: &DiscussionTree, ranker: &Ranker, idx: Index) -> String {
    let Some(entry) = tree.entry(idx) else {
        return String::from("?");
    };
    let mut line = format!(
        "#{} {} [{} pts, score {:.8}",
        entry.id,
        entry.label(),
        entry.points(),
        ranker.score(tree, Some(idx))
    );
    let replies = tree.child_count(idx);
    if replies > 0 {
        line.push_str(&format!(", {} replies", replies));
    }
    line.push(']');
    match entry.user_vote {
        Some(VoteDirection::Up) => line.push_str(" (+)"),
        Some(VoteDirection::Down) => line.push_str(" (-)"),
        _ => {}
    }
    if let Some(handle) = &entry.author_handle {
        line.push_str(&format!(" by {}", handle));
    }
    line
}

fn build_tree(tree: &DiscussionTree, ranker: &Ranker, idx: Index) -> Tree<String> {
    let leaves: Vec<_> = tree
        .children(idx)
        .map(|child| build_tree(tree, ranker, child))
        .collect();
    Tree::new(node_line(tree, ranker, idx)).with_leaves(leaves)
}

impl TreeNodeConvert for RankedThread {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        match self.tree.root() {
            Some(root) => build_tree(&self.tree, &self.ranker, root),
            None => Tree::new("Empty tree".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArrangeReport, Content, Entry};
    use chrono::{TimeZone, Utc};

    #[test]
    fn given_thread_when_rendered_then_replies_nested_under_root() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut tree = DiscussionTree::new();
        let root = tree
            .insert_root(Entry::new(1, Content::Container, now).with_title("forum"))
            .unwrap();
        tree.push_child(root, Entry::new(2, Content::Text("hello".into()), now))
            .unwrap();
        let thread = RankedThread {
            tree,
            report: ArrangeReport::default(),
            ranker: Ranker::new(Default::default(), now),
        };

        let rendered = thread.to_tree_string().to_string();

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("#1 forum"));
        assert!(lines[0].contains("1 replies"));
        assert!(lines[1].contains("#2 hello"));
    }
}

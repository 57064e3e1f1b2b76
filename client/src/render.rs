//! Text rendering of manager replies.

use comm::Reply;
use ring::{MembershipChange, Snapshot};
use std::fmt::Write;

pub fn reply(reply: &Reply) -> String {
    let mut out = String::new();
    // Writing into a String can't fail.
    let _ = match reply {
        Reply::NodeAdded(change) => membership(&mut out, "added", change),
        Reply::NodeRemoved(change) => membership(&mut out, "removed", change),
        Reply::DataAdded(point) => writeln!(
            out,
            "{} -> {} ({}) at {}",
            point.key, point.node, point.label, point.position
        ),
        Reply::Rejected(reason) => writeln!(out, "rejected: {reason}"),
        Reply::Auto { running: true } => writeln!(out, "auto generation running"),
        Reply::Auto { running: false } => writeln!(out, "auto generation stopped"),
        Reply::Status {
            snapshot,
            auto_running,
        } => status(&mut out, snapshot, *auto_running),
        Reply::Done => writeln!(out, "ok"),
    };
    out
}

fn membership(out: &mut String, verb: &str, change: &MembershipChange) -> std::fmt::Result {
    let node = &change.node;
    writeln!(
        out,
        "{verb} {} ({}) at {}, {} key(s) moved",
        node.id,
        node.label,
        node.position,
        change.migrations.len()
    )?;
    for m in &change.migrations {
        writeln!(out, "  {}: {} -> {}", m.key, m.from, m.to)?;
    }
    Ok(())
}

fn status(out: &mut String, snapshot: &Snapshot, auto_running: bool) -> std::fmt::Result {
    writeln!(
        out,
        "{} node(s), {} data point(s), auto generation {}",
        snapshot.nodes.len(),
        snapshot.data_points.len(),
        if auto_running { "on" } else { "off" }
    )?;

    for load in snapshot.distribution() {
        let node = &load.node;
        writeln!(
            out,
            "{} ({}) at {}: {} item(s)",
            node.id, node.label, node.position, load.count
        )?;
        for (key, value) in &load.recent {
            writeln!(out, "  {key}: {value}")?;
        }
        if load.count > load.recent.len() {
            writeln!(out, "  +{} more...", load.count - load.recent.len())?;
        }
    }
    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell
#![no_main]

use cpan_depgraph::graph::DependencyGraph;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(mut graph) = DependencyGraph::from_json(content) else {
        return;
    };

    let json = graph.to_json().expect("a parsed graph serializes");
    let reparsed = DependencyGraph::from_json(&json).expect("serialized graph parses");
    assert_eq!(reparsed, graph);

    // Keep the walk small enough to finish
    if graph.edge_count() <= 64 {
        graph.score();
    }
});

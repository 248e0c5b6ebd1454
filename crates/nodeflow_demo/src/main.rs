// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless calculator walkthrough.
//!
//! Builds the calculator graph an editor would show, drives it the way a user
//! would, and logs what every display ends up holding:
//! - a number source scaled into a display
//! - the same source converted to text
//! - a division that hits zero and recovers
//! - a snapshot written to RON and restored

use nodeflow_graph::nodes::calculator::{
    create_calculator_registry, DivisionModel, NumberDisplayModel, NumberSourceModel, TextDisplayModel,
};
use nodeflow_graph::{Graph, GraphSnapshot, NodeDataModel, NodeId, NodeModelRegistry};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let mut env_filter = EnvFilter::from_default_env();
    for directive in ["nodeflow_demo=info", "nodeflow_graph=debug"] {
        match directive.parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring log directive '{directive}': {e}"),
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting nodeflow demo v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        tracing::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> nodeflow_graph::error::Result<()> {
    let registry = create_calculator_registry();
    for name in registry.model_names() {
        tracing::info!("Registered model '{}' ({:?})", name, registry.category_of(name));
    }

    let mut graph = Graph::from_registry("calculator", &registry);
    let source = graph.create_node(&registry, "NumberSource")?;
    let scale = graph.create_node(&registry, "Scale")?;
    let display_node = graph.create_node(&registry, "NumberDisplay")?;
    let text = graph.create_node(&registry, "TextDisplay")?;

    graph.connect(source, 0, scale, 0)?;
    graph.connect(scale, 0, display_node, 0)?;
    graph.connect(source, 0, text, 0)?;

    graph.subscribe(display_node, |node, event| tracing::info!("Display {} emitted {:?}", node, event))?;

    let report = graph.update_model::<NumberSourceModel, _>(source, |model, signals| {
        model.set_number(5.0, signals);
    })?;
    tracing::info!(
        "Source set to 5: display={:?} text={:?} ({} deliveries)",
        graph.model::<NumberDisplayModel>(display_node).and_then(NumberDisplayModel::value),
        graph.model::<TextDisplayModel>(text).and_then(TextDisplayModel::text),
        report.deliveries
    );

    divide(&mut graph, &registry, source)?;

    let snapshot = GraphSnapshot::capture(&graph);
    let encoded = snapshot.to_ron()?;
    tracing::info!("Snapshot:\n{}", encoded);

    let (restored, ids) = GraphSnapshot::from_ron(&encoded)?.restore(&registry)?;
    tracing::info!(
        "Restored '{}' with {} nodes and {} connections; source={:?}",
        restored.name,
        restored.node_count(),
        restored.connection_count(),
        ids.first()
            .and_then(|id| restored.model::<NumberSourceModel>(*id))
            .and_then(NumberSourceModel::number)
    );
    Ok(())
}

/// Feed the source into a division and walk the denominator through zero
fn divide(
    graph: &mut Graph,
    registry: &NodeModelRegistry,
    numerator: NodeId,
) -> nodeflow_graph::error::Result<()> {
    let denominator = graph.create_node(registry, "NumberSource")?;
    let division = graph.create_node(registry, "Division")?;
    let quotient = graph.create_node(registry, "NumberDisplay")?;
    graph.connect(numerator, 0, division, 0)?;
    graph.connect(denominator, 0, division, 1)?;
    graph.connect(division, 0, quotient, 0)?;

    for value in [0.0, 2.0] {
        graph.update_model::<NumberSourceModel, _>(denominator, |model, signals| {
            model.set_number(value, signals);
        })?;

        if let Some(model) = graph.model::<DivisionModel>(division) {
            tracing::info!(
                "Denominator {}: quotient={:?} state={:?} message='{}'",
                value,
                graph.model::<NumberDisplayModel>(quotient).and_then(NumberDisplayModel::value),
                model.validation_state(),
                model.validation_message()
            );
        }
    }
    Ok(())
}

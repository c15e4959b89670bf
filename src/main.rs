use squareloop::config::{parse_ratio_list, validate_window, Config};
use squareloop::constants::OVERPASS_QUERY_TIMEOUT_SECONDS;
use squareloop::graph::overpass::road_network_query;
use squareloop::models::GeoPoint;
use squareloop::services::cleaner::{analyze_feature_collection, clean_feature_collection};
use squareloop::services::geojson_export::{plan_to_feature_collection, route_feature_mut};
use squareloop::{AppError, RoadGraph, RouteGenerator};
use std::env;
use std::fs;
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        "\
Usage: squareloop <COMMAND> [OPTIONS]

Commands:
  plan      Plan a square loop on an Overpass JSON road network
  query     Print the Overpass QL query for the network a plan needs
  clean     Remove duplicates and short backtracks from a GeoJSON file
  analyze   Report duplicates and backtracks without changing the file

Options (plan):
  --graph=FILE          Overpass API JSON response with nodes and ways
  --lat=F --lon=F       Start point
  --length=M            Target route length in meters
  --ratios=LIST         Ratio denominators, e.g. 7,6.5,6
  --policy=P            'unrestricted' or 'fail' for legs without a disjoint path
  --out=FILE            Write the GeoJSON result here (default: stdout)
  --clean               Clean the route feature before writing

Options (query):
  --lat=F --lon=F --length=M [--ratios=LIST]

Options (clean / analyze):
  --in=FILE             Input GeoJSON
  --out=FILE            Output GeoJSON (clean only, default: stdout)
  --window=N            Backtrack look-ahead window

  --help                Show this help message"
    );
}

fn arg<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter().find_map(|a| a.strip_prefix(name))
}

fn required<'a>(args: &'a [String], name: &str) -> Result<&'a str, String> {
    arg(args, name).ok_or_else(|| format!("Missing required option {}VALUE", name))
}

fn parse_f64(args: &[String], name: &str) -> Result<f64, String> {
    required(args, name)?
        .parse()
        .map_err(|_| format!("Invalid number for {}", name))
}

fn apply_overrides(config: &mut Config, args: &[String]) -> Result<(), String> {
    if let Some(raw) = arg(args, "--ratios=") {
        config.route_generator.ratio_denominators = parse_ratio_list(raw)?;
    }
    if let Some(raw) = arg(args, "--policy=") {
        config.route_generator.fallback_policy = raw.parse()?;
    }
    if let Some(raw) = arg(args, "--window=") {
        let window: usize = raw.parse().map_err(|_| "Invalid --window value")?;
        validate_window(window)?;
        config.cleaner.backtrack_window = window;
    }
    Ok(())
}

fn write_output(args: &[String], contents: &str) -> Result<(), Box<dyn std::error::Error>> {
    match arg(args, "--out=") {
        Some(path) => {
            fs::write(path, contents)?;
            tracing::info!("Wrote {}", path);
        }
        None => println!("{}", contents),
    }
    Ok(())
}

fn start_point(args: &[String]) -> Result<GeoPoint, String> {
    GeoPoint::new(parse_f64(args, "--lon=")?, parse_f64(args, "--lat=")?)
}

fn run_plan(config: &Config, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let graph_path = required(args, "--graph=")?;
    let start = start_point(args)?;
    let target_length_m = parse_f64(args, "--length=")?;

    tracing::info!("Loading road network from {}", graph_path);
    let graph = RoadGraph::from_overpass_json(&fs::read_to_string(graph_path)?)?;
    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        components = graph.connected_component_count(),
        "Road network loaded"
    );

    let generator = RouteGenerator::new(config.route_generator.clone());
    let plan = generator.generate_square_loop(&graph, start, target_length_m)?;

    let segments = graph.segment_summary(&plan.best.node_path);
    let collection = plan_to_feature_collection(&plan, Some(&segments), OffsetDateTime::now_utc())?;
    let mut output = serde_json::to_value(&collection)?;

    // Only the route; the outline and markers are not traces
    if args.iter().any(|a| a == "--clean") {
        if let Some(route) = route_feature_mut(&mut output) {
            clean_feature_collection(route, config.cleaner.backtrack_window);
        }
    }

    write_output(args, &serde_json::to_string_pretty(&output)?)
}

fn run_query(config: &Config, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let start = start_point(args)?;
    let target_length_m = parse_f64(args, "--length=")?;

    let generator = RouteGenerator::new(config.route_generator.clone());
    let region = generator.network_region(&start, target_length_m)?;
    println!("{}", road_network_query(&region, OVERPASS_QUERY_TIMEOUT_SECONDS));
    Ok(())
}

fn run_clean(config: &Config, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let input = required(args, "--in=")?;
    let mut collection: serde_json::Value = serde_json::from_str(&fs::read_to_string(input)?)?;

    let report = clean_feature_collection(&mut collection, config.cleaner.backtrack_window);
    eprintln!("{}", serde_json::to_string_pretty(&report)?);

    write_output(args, &serde_json::to_string_pretty(&collection)?)
}

fn run_analyze(config: &Config, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let input = required(args, "--in=")?;
    let collection: serde_json::Value = serde_json::from_str(&fs::read_to_string(input)?)?;

    let report = analyze_feature_collection(&collection, config.cleaner.backtrack_window);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "squareloop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.iter().any(|a| a == "--help") {
        print_help();
        return Ok(());
    }

    let mut config = Config::from_env().map_err(AppError::Config)?;
    apply_overrides(&mut config, &args).map_err(AppError::Config)?;

    match args[1].as_str() {
        "plan" => run_plan(&config, &args),
        "query" => run_query(&config, &args),
        "clean" => run_clean(&config, &args),
        "analyze" => run_analyze(&config, &args),
        other => {
            print_help();
            Err(format!("Unknown command: {}", other).into())
        }
    }
}

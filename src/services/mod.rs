pub mod cleaner;
pub mod geojson_export;
pub mod route_generator;

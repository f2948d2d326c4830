//! One grid request from files.

use std::path::{Path, PathBuf};

use gridquery_core::{
    Catalog, GridConfig, GridService, MemoryDataset, MemoryEngine, MetadataProvider, SchemaBundle,
};
use gridquery_proto::{GridResponse, RequestModel};
use thiserror::Error;

use crate::Args;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no schema: pass --schema or a --catalog holding one")]
    MissingSchema,

    #[error("invalid request file: {0}")]
    Request(#[source] serde_json::Error),

    #[error(transparent)]
    Core(#[from] gridquery_core::Error),
}

/// A served page and the column paths it was requested with.
pub struct Page {
    pub response: GridResponse,
    pub columns: Vec<String>,
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn run(args: &Args) -> Result<Page, CliError> {
    let schema_text = args.schema.as_deref().map(read).transpose()?;

    let request: RequestModel =
        serde_json::from_str(&read(&args.request)?).map_err(CliError::Request)?;
    let config = grid_config(args)?;
    let data = read(&args.data)?;

    match &args.catalog {
        Some(dir) => {
            let db = sled::open(dir).map_err(gridquery_core::Error::from)?;
            let catalog = Catalog::open(&db)?;
            if let Some(text) = &schema_text {
                let bundle = SchemaBundle::from_json(0, text)?;
                if !same_schema(catalog.current_schema().as_ref(), &bundle) {
                    let version = catalog.apply_schema(bundle)?;
                    tracing::info!(version, "schema applied to catalog");
                }
            }
            catalog.flush()?;
            let schema = catalog.current_schema().ok_or(CliError::MissingSchema)?;
            serve(catalog, schema, &data, &request, config, &args.root)
        }
        None => {
            let text = schema_text.ok_or(CliError::MissingSchema)?;
            let schema = SchemaBundle::from_json(1, &text)?;
            serve(schema.clone(), schema, &data, &request, config, &args.root)
        }
    }
}

fn serve<M: MetadataProvider>(
    metadata: M,
    schema: SchemaBundle,
    data: &str,
    request: &RequestModel,
    config: GridConfig,
    root: &str,
) -> Result<Page, CliError> {
    let dataset = MemoryDataset::from_json(&schema, data)?;
    let service = GridService::new(metadata, MemoryEngine::new(schema, dataset), config);
    let response = service.handle(root, request, &[])?;

    let columns = request
        .columns
        .iter()
        .map(|c| c.data.clone())
        .filter(|path| !path.trim().is_empty())
        .collect();
    Ok(Page { response, columns })
}

fn grid_config(args: &Args) -> Result<GridConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => GridConfig::from_json_file(path)?,
        None => GridConfig::default(),
    };
    if args.row_id {
        config = config.with_row_id();
    }
    if let Some(class) = &args.row_class {
        config = config.with_row_class(class.clone());
    }
    Ok(config)
}

/// Whether the catalog already holds `bundle`, ignoring version and timestamp.
fn same_schema(current: Option<&SchemaBundle>, bundle: &SchemaBundle) -> bool {
    current.is_some_and(|c| c.entities == bundle.entities && c.relations == bundle.relations)
}

//! Listing of the active field-mapping table.

use anyhow::Result;
use log::info;

use crate::{cli::MappingsArgs, mapping::MappingTable, table};

pub fn execute(args: &MappingsArgs) -> Result<()> {
    let mappings = match &args.mappings {
        Some(path) => MappingTable::load(path)?,
        None => MappingTable::onspd(),
    };

    if args.yaml {
        print!("{}", mappings.to_yaml()?);
        return Ok(());
    }

    let headers = vec![
        "#".to_string(),
        "column".to_string(),
        "source".to_string(),
        "type".to_string(),
        "transform".to_string(),
        "depends_on".to_string(),
    ];
    let rows = mappings
        .iter()
        .enumerate()
        .map(|(idx, mapping)| {
            vec![
                (idx + 1).to_string(),
                mapping.column.clone(),
                mapping.source.clone(),
                mapping
                    .field_type
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                mapping
                    .transform
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                mapping.depends_on.clone().unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!("Listed {} field mapping(s)", mappings.len());
    Ok(())
}

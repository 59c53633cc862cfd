use ttl::input::{Command, InputCommand};
use ttl::Result;

use std::{fs::File, path::Path};

use csv::{DeserializeRecordsIntoIter, ReaderBuilder, Trim};

/// Commands of a script in file order, one item per row. A row that fails to deserialize or
/// parse yields an error without ending the iteration.
pub struct ScriptCommands {
    records: DeserializeRecordsIntoIter<File, InputCommand>,
}

impl Iterator for ScriptCommands {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        log::debug!("Parsing script row: {record:?}");

        Some(record.map_err(anyhow::Error::from).and_then(InputCommand::parse_command))
    }
}

pub fn read_script(path: &Path) -> Result<ScriptCommands> {
    let reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)?;

    return Ok(ScriptCommands {
        records: reader.into_deserialize(),
    });
}

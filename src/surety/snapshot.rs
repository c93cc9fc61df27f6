use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::{SuretyError, SuretyResult};
use crate::events::Event;
use crate::insurance::PayoutSink;
use crate::primitives::Address;
use crate::surety::{FlightSurety, SuretyData};

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk image of a deployment: state, facade identity and committed events.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub app: Address,
    pub state: SuretyData,
    pub events: Vec<Event>,
}

impl FlightSurety {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            app: self.app,
            state: self.state.read().clone(),
            events: self.events.read().clone(),
        }
    }

    /// Write the snapshot as pretty JSON, replacing the file atomically.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> SuretyResult<()> {
        let path = path.as_ref();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".partial");
        let tmp = PathBuf::from(tmp);

        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, &self.snapshot())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&tmp, path)?;
        info!("Saved snapshot to {}", path.display());
        Ok(())
    }

    pub fn load_snapshot<P: AsRef<Path>>(
        path: P,
        payouts: Box<dyn PayoutSink>,
    ) -> SuretyResult<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        Self::from_snapshot(snapshot, payouts)
    }

    /// Rebuild a deployment. Component parameters are re-derived from the embedded
    /// configuration, which must be valid, and the balance must be accounted for.
    pub fn from_snapshot(
        mut snapshot: Snapshot,
        payouts: Box<dyn PayoutSink>,
    ) -> SuretyResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SuretyError::Config(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        snapshot.state.restore()?;
        info!(
            "Restored deployment {} with {} committed events",
            snapshot.app,
            snapshot.events.len()
        );
        Ok(FlightSurety::from_parts(
            snapshot.app,
            snapshot.state,
            snapshot.events,
            payouts,
        ))
    }
}

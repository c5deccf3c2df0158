//! Data model: queue messages, scanner inputs/outputs, processing results.

mod scanner;
mod task;

pub use scanner::{
    DnsxData, DnsxInput, HttpxData, HttpxHostResult, HttpxInput, NaabuData, NaabuInput,
    NucleiData, NucleiInput, NucleiVulnerability, PortInfo, ResolutionInfo, ResolutionStatus,
    ScanData, ScanProtocol, ScannerInput, SubfinderData, SubfinderInput,
};
pub use task::{MessageProcessingResult, TaskKind, TaskMessage, TaskResult, TaskStatus};

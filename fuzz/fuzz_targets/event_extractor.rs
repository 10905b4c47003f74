#![no_main]

use libfuzzer_sys::fuzz_target;
use schedspread::analyzer::{AnalysisSettings, DistributionAnalyzer};
use schedspread::events;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither extraction nor analysis may panic on any line
        let _ = events::extract(input);

        if let Ok(mut analyzer) = DistributionAnalyzer::new(&AnalysisSettings::new("1", 4)) {
            for line in input.lines() {
                let _ = analyzer.process_line(line);
            }
            let _ = analyzer.finish();
        }
    }
});

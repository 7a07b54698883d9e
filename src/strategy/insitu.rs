use super::{candidates_by_point, candidates_by_time, MatchupStrategy, ToolContext};
use crate::{
    condition::ProductSizes,
    error::MatchupResult,
    observation::SatelliteObservation,
    permutator::SampleReceiverPermutator,
    sample::{MatchupCollection, SampleSet},
    sample_collector::SampleCollector,
};
use std::sync::Arc;

/**
 * Matches point measurements of an in-situ primary sensor with satellite swaths.
 *
 * Every in-situ sample inside the processing window is looked up in the swaths that were sensing
 * within the time delta and cover its location. The lookups are grouped per swath file so each
 * file is opened once per in-situ file.
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct InsituMatchupStrategy {}

impl InsituMatchupStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the matchups of a single in-situ file.
    pub fn match_insitu(
        &self,
        context: &ToolContext,
        insitu: &SatelliteObservation,
    ) -> MatchupResult<MatchupCollection> {
        let config = &context.config;
        let delta = config.time_delta;
        let window = config.processing_window();

        let samples = {
            let mut reader = context.open_reader(insitu)?;
            let samples = reader.insitu_samples(&window)?;
            reader.close();
            samples
        };
        log::debug!(
            "{} in-situ samples in {}",
            samples.len(),
            insitu.data_file_path().display()
        );

        let mut receiver = SampleReceiverPermutator::new(&config.secondary_names());
        receiver.set_current_primary(insitu);

        let samples: Vec<_> = samples.into_iter().map(Arc::new).collect();
        let mut sizes = ProductSizes::new();
        let search_window = window.widen(delta);

        for sensor in &config.secondaries {
            let name = sensor.name();
            let satellites = context.archive.query(name, &search_window);

            // Samples per swath file, in order of first occurrence.
            let mut per_product: Vec<(&SatelliteObservation, Vec<SampleSet>)> = vec![];
            for sample in &samples {
                let candidates =
                    candidates_by_time(satellites.iter().copied(), sample.time, delta);
                for candidate in candidates_by_point(candidates, sample.lon, sample.lat) {
                    let set = SampleSet::new(Arc::clone(sample));
                    match per_product
                        .iter_mut()
                        .find(|(obs, _)| obs.data_file_path() == candidate.data_file_path())
                    {
                        Some((_, sets)) => sets.push(set),
                        None => per_product.push((candidate, vec![set])),
                    }
                }
            }

            for (satellite, sample_sets) in per_product {
                let reader = match context.open_reader(satellite) {
                    Ok(reader) => reader,
                    Err(err) if err.is_recoverable() => {
                        log::warn!("Skipping {}: {}", satellite.data_file_path().display(), err);
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                sizes.insert(satellite.data_file_path(), reader.product_size()?);

                let collector =
                    SampleCollector::new(reader.pixel_locator()?, config.sampling_interval);
                let sample_sets =
                    collector.add_secondary_samples(sample_sets, reader.time_locator()?, name)?;

                for sample_set in sample_sets {
                    receiver.set_primary_sample(sample_set.primary().clone())?;
                    let sample = sample_set.secondary(name).cloned();
                    receiver.add_secondary_sample(satellite, sample)?;
                }
            }
        }

        let mut collection = receiver.permutations();
        context.condition_engine().process(&mut collection, &sizes);

        Ok(collection)
    }
}

impl MatchupStrategy for InsituMatchupStrategy {
    fn create_matchup_collection(
        &self,
        context: &ToolContext,
    ) -> MatchupResult<MatchupCollection> {
        let insitu_files = context.primary_observations();
        if insitu_files.is_empty() {
            log::warn!(
                "No in-situ data in time interval: {}",
                context.config.processing_window()
            );
            return Ok(MatchupCollection::new());
        }

        let mut collection = MatchupCollection::new();
        for insitu in insitu_files {
            match self.match_insitu(context, insitu) {
                Ok(found) => collection.merge(found),
                Err(err) if err.is_recoverable() => {
                    log::warn!("Skipping {}: {}", insitu.data_file_path().display(), err);
                }
                Err(err) => return Err(err),
            }
        }

        log::info!(
            "Found {} in-situ matchups in {} matchup sets",
            collection.num_matchups(),
            collection.sets().len()
        );

        Ok(collection)
    }
}

use super::{
    candidates_by_geometry, candidates_by_time_window, MatchupStrategy, SwathLocator, ToolContext,
};
use crate::{
    condition::ProductSizes,
    error::MatchupResult,
    intersection::intersecting_intervals,
    observation::SatelliteObservation,
    permutator::SampleReceiverPermutator,
    sample::MatchupCollection,
    sample_collector::SampleCollector,
};

/**
 * Matches a polar orbiting primary sensor with polar orbiting secondary sensors.
 *
 * For every primary file the secondary files observed close enough in time and space are
 * intersected with it. Inside every common area sampled close enough in time the primary pixels are
 * collected and looked up in the secondary swath.
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct PolarOrbitingMatchupStrategy {}

impl PolarOrbitingMatchupStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Find the matchups of a single primary file.
     *
     * Secondary files that can't be read, and common areas without usable pixel locators, are
     * logged and skipped.
     */
    pub fn match_primary(
        &self,
        context: &ToolContext,
        primary: &SatelliteObservation,
    ) -> MatchupResult<MatchupCollection> {
        let config = &context.config;
        let delta = config.time_delta;

        let primary_reader = context.open_reader(primary)?;
        let mut sizes = ProductSizes::new();
        sizes.insert(primary.data_file_path(), primary_reader.product_size()?);

        let mut receiver = SampleReceiverPermutator::new(&config.secondary_names());
        receiver.set_current_primary(primary);

        for sensor in &config.secondaries {
            let name = sensor.name();

            let candidates = candidates_by_time_window(
                context.archive.observations(name),
                primary.start_time(),
                primary.stop_time(),
                delta,
            );
            let candidates = candidates_by_geometry(candidates, primary.geo_bounds());
            log::debug!(
                "{} candidates of {} for {}",
                candidates.len(),
                name,
                primary.data_file_path().display()
            );

            for secondary in candidates {
                let secondary_reader = match context.open_reader(secondary) {
                    Ok(reader) => reader,
                    Err(err) if err.is_recoverable() => {
                        log::warn!("Skipping {}: {}", secondary.data_file_path().display(), err);
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                sizes.insert(secondary.data_file_path(), secondary_reader.product_size()?);

                for intersection in intersecting_intervals(primary, secondary) {
                    if intersection.time_info.min_time_delta >= delta {
                        continue;
                    }

                    let locators = SwathLocator::for_part(
                        primary_reader.as_ref(),
                        primary,
                        intersection.primary_index,
                    )
                    .and_then(|p| {
                        SwathLocator::for_part(
                            secondary_reader.as_ref(),
                            secondary,
                            intersection.secondary_index,
                        )
                        .map(|s| (p, s))
                    });

                    let (primary_locator, secondary_locator) = match locators {
                        Ok(locators) => locators,
                        Err(err) if err.is_recoverable() => {
                            log::warn!(
                                "Unable to create valid pixel locators, skipping intersection: {}",
                                err
                            );
                            continue;
                        }
                        Err(err) => return Err(err),
                    };

                    let sample_sets =
                        SampleCollector::new(primary_locator.get(), config.sampling_interval)
                            .add_primary_samples(
                                &intersection.polygon,
                                primary_reader.time_locator()?,
                            )?;

                    let sample_sets =
                        SampleCollector::new(secondary_locator.get(), config.sampling_interval)
                            .add_secondary_samples(
                                sample_sets,
                                secondary_reader.time_locator()?,
                                name,
                            )?;

                    for sample_set in sample_sets {
                        receiver.set_primary_sample(sample_set.primary().clone())?;
                        let sample = sample_set.secondary(name).cloned();
                        receiver.add_secondary_sample(secondary, sample)?;
                    }
                }
            }
        }

        let mut collection = receiver.permutations();
        context.condition_engine().process(&mut collection, &sizes);

        Ok(collection)
    }
}

impl MatchupStrategy for PolarOrbitingMatchupStrategy {
    fn create_matchup_collection(
        &self,
        context: &ToolContext,
    ) -> MatchupResult<MatchupCollection> {
        let primaries = context.primary_observations();
        log::info!("Matching {} primary observations", primaries.len());

        let mut collection = MatchupCollection::new();
        for primary in primaries {
            match self.match_primary(context, primary) {
                Ok(found) => collection.merge(found),
                Err(err) if err.is_recoverable() => {
                    log::warn!("Skipping {}: {}", primary.data_file_path().display(), err);
                }
                Err(err) => return Err(err),
            }
        }

        log::info!(
            "Found {} matchups in {} matchup sets",
            collection.num_matchups(),
            collection.sets().len()
        );

        Ok(collection)
    }
}

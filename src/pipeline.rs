use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};

use crate::{
    CentroidComputer, ClusterExtractor, Error, Frame, NearestSelector, Params, PlaneRemover, Result,
    SelectionResult, SpatialIndex, StopReason, VoxelDownsampler,
};

/// What happened to one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub input_points: usize,
    /// Points left after the mask and the non-finite filter.
    pub target_points: usize,
    pub residual_points: usize,
    pub downsampled_points: usize,
    pub planes_removed: usize,
    pub plane_stop: Option<StopReason>,
    pub clusters: usize,
    pub rejected_clusters: usize,
    /// Set when the frame was aborted by an error.
    pub error: Option<String>,
    pub elapsed: Duration,
    pub result: SelectionResult,
}

/// Plane removal, downsampling, clustering and selection for one frame at a
/// time. Holds nothing but the configuration and the in-flight flag.
#[derive(Debug)]
pub struct Pipeline {
    params: Params,
    plane_remover: PlaneRemover,
    voxel: VoxelDownsampler,
    extractor: ClusterExtractor,
    selector: NearestSelector,
    busy: AtomicBool,
    dropped: AtomicU64,
}

impl Pipeline {
    pub fn new(params: Params) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            plane_remover: PlaneRemover::new(params.plane.clone()),
            voxel: VoxelDownsampler::new(params.voxel.leaf_size)?,
            extractor: ClusterExtractor::from_params(&params.cluster)?,
            selector: NearestSelector::from_params(&params.selection)?,
            params,
            busy: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Number of frames refused by [`Pipeline::offer`] so far.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Run `frame` unless another one is in flight, in which case the new
    /// frame is dropped and `None` returned.
    pub fn offer(&self, frame: &Frame) -> Option<FrameReport> {
        let slot = self.try_begin()?;
        Some(slot.process(frame))
    }

    /// Claim the pipeline for one frame. `None` (and a dropped frame) while
    /// another slot is alive.
    pub fn try_begin(&self) -> Option<FrameSlot<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("previous frame still processing, dropping frame ({dropped} dropped so far)");
            return None;
        }
        Some(FrameSlot { pipeline: self })
    }

    /// Process one frame to completion. Never fails: frame errors are logged
    /// and reported as `NotFound`.
    pub fn process(&self, frame: &Frame) -> FrameReport {
        let start = Instant::now();
        let mut report = FrameReport {
            input_points: frame.cloud.len(),
            ..FrameReport::default()
        };

        report.result = match self.run(frame, &mut report) {
            Ok(result) => result,
            Err(Error::EmptyInput) => {
                debug!("frame has no usable points");
                SelectionResult::NotFound
            }
            Err(e) => {
                error!("frame aborted: {e}");
                report.error = Some(e.to_string());
                SelectionResult::NotFound
            }
        };
        report.elapsed = start.elapsed();

        match &report.result {
            SelectionResult::Found { centroid, distance } => info!(
                "target at ({:.3}, {:.3}, {:.3}), {:.3} m away, cluster {} of {} points ({:?})",
                centroid.point.x,
                centroid.point.y,
                centroid.point.z,
                distance,
                centroid.cluster_id,
                centroid.size,
                report.elapsed
            ),
            SelectionResult::NotFound => info!("no target this frame ({:?})", report.elapsed),
        }

        report
    }

    fn run(&self, frame: &Frame, report: &mut FrameReport) -> Result<SelectionResult> {
        if frame.cloud.is_empty() {
            return Err(Error::EmptyInput);
        }

        let points = frame.target_points()?;
        report.target_points = points.len();
        if points.is_empty() {
            return Err(Error::EmptyInput);
        }

        let timer = Instant::now();
        let removal = self.plane_remover.remove(&points);
        report.planes_removed = removal.planes.len();
        report.plane_stop = Some(removal.stop);
        report.residual_points = removal.residual.len();
        debug!(
            "plane removal: {} -> {} points, {} planes, {:?} ({:?})",
            points.len(),
            removal.residual.len(),
            removal.planes.len(),
            removal.stop,
            timer.elapsed()
        );

        let timer = Instant::now();
        let reduced = self.voxel.downsample(&removal.residual);
        report.downsampled_points = reduced.len();
        debug!(
            "voxel grid {}: {} -> {} points ({:?})",
            self.voxel.leaf_size(),
            removal.residual.len(),
            reduced.len(),
            timer.elapsed()
        );
        if reduced.is_empty() {
            return Ok(SelectionResult::NotFound);
        }

        let timer = Instant::now();
        let index = SpatialIndex::build(&reduced, self.params.cluster.resolution())?;
        let extraction = self.extractor.extract(&index);
        report.clusters = extraction.clusters.len();
        report.rejected_clusters = extraction.too_small + extraction.too_large;
        debug!(
            "clustering: {} clusters over {} voxels ({:?})",
            extraction.clusters.len(),
            index.occupied_voxels(),
            timer.elapsed()
        );

        let centroids = CentroidComputer.centroids(&reduced, &extraction.clusters)?;
        Ok(self.selector.select(&centroids))
    }
}

/// Exclusive right to process one frame; releases the pipeline when dropped.
#[derive(Debug)]
pub struct FrameSlot<'a> {
    pipeline: &'a Pipeline,
}

impl FrameSlot<'_> {
    pub fn process(self, frame: &Frame) -> FrameReport {
        self.pipeline.process(frame)
    }
}

impl Drop for FrameSlot<'_> {
    fn drop(&mut self) {
        self.pipeline.busy.store(false, Ordering::Release);
    }
}

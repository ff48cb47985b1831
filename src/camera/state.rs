//! Shared camera state
//!
//! One short-held mutex guards the whole parameter record, so a snapshot is
//! always a single coherent pose. The lock is only ever held for a copy or a
//! merge, never across I/O or rendering.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::control::{CameraUpdate, ControlMessage};
use crate::error::{AppError, Result};
use crate::render::Correction;
use crate::video::Resolution;

/// Row-major 3x3 matrix
pub type Mat3 = [[f32; 3]; 3];

pub const IDENTITY3: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Value copy of everything a renderer needs for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParameters {
    /// Output resolution
    pub resolution: Resolution,
    /// Pinhole intrinsics
    pub intrinsics: Mat3,
    /// World-to-camera rotation
    pub rotation: Mat3,
    /// World-to-camera translation
    pub translation: [f32; 3],
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Playback time for volumetric video
    pub time: f32,
    /// Color exposure multiplier
    pub exposure: f32,
    /// Color offset
    pub offset: f32,
}

impl CameraParameters {
    /// Default camera for a resolution
    ///
    /// Focal length equals the image width with the principal point at the
    /// image center.
    pub fn with_resolution(resolution: Resolution) -> Self {
        Self {
            resolution,
            intrinsics: default_intrinsics(resolution),
            rotation: IDENTITY3,
            translation: [0.0, 0.0, 0.0],
            near: 0.01,
            far: 100.0,
            time: 0.0,
            exposure: 1.0,
            offset: 0.0,
        }
    }

    /// Color correction requested for this frame
    pub fn correction(&self) -> Correction {
        Correction::new(self.exposure, self.offset)
    }

    /// Check the parameters describe a renderable camera
    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_valid() {
            return Err(AppError::InvalidControl(format!(
                "invalid resolution {}",
                self.resolution
            )));
        }

        let finite = self
            .intrinsics
            .iter()
            .chain(self.rotation.iter())
            .flatten()
            .chain(self.translation.iter())
            .chain([self.near, self.far, self.time, self.exposure, self.offset].iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err(AppError::InvalidControl(
                "camera contains non-finite values".to_string(),
            ));
        }

        if self.near <= 0.0 || self.far <= self.near {
            return Err(AppError::InvalidControl(format!(
                "invalid clipping planes near={} far={}",
                self.near, self.far
            )));
        }
        if self.exposure < 0.0 {
            return Err(AppError::InvalidControl(format!(
                "negative exposure {}",
                self.exposure
            )));
        }
        Ok(())
    }

    /// Merge a partial update into a copy of these parameters
    ///
    /// When the resolution changes and no intrinsics are supplied, the
    /// current intrinsics are rescaled to the new image size.
    pub fn merged(&self, update: &CameraUpdate) -> Self {
        let mut next = *self;

        let resolution = Resolution::new(
            update.width.unwrap_or(self.resolution.width),
            update.height.unwrap_or(self.resolution.height),
        );
        if resolution != self.resolution {
            next.resolution = resolution;
            next.intrinsics = rescale_intrinsics(&self.intrinsics, self.resolution, resolution);
        }
        if let Some(k) = update.intrinsics {
            next.intrinsics = k;
        }
        if let Some(r) = update.rotation {
            next.rotation = r;
        }
        if let Some(t) = update.translation {
            next.translation = t;
        }
        if let Some(near) = update.near {
            next.near = near;
        }
        if let Some(far) = update.far {
            next.far = far;
        }
        if let Some(time) = update.time {
            next.time = time;
        }
        if let Some(exposure) = update.exposure {
            next.exposure = exposure;
        }
        if let Some(offset) = update.offset {
            next.offset = offset;
        }
        next
    }
}

fn default_intrinsics(resolution: Resolution) -> Mat3 {
    let w = resolution.width as f32;
    let h = resolution.height as f32;
    [[w, 0.0, w / 2.0], [0.0, w, h / 2.0], [0.0, 0.0, 1.0]]
}

fn rescale_intrinsics(k: &Mat3, from: Resolution, to: Resolution) -> Mat3 {
    if from.width == 0 || from.height == 0 {
        return default_intrinsics(to);
    }
    let sx = to.width as f32 / from.width as f32;
    let sy = to.height as f32 / from.height as f32;
    let mut out = *k;
    for v in out[0].iter_mut() {
        *v *= sx;
    }
    for v in out[1].iter_mut() {
        *v *= sy;
    }
    out
}

struct Versioned {
    params: CameraParameters,
    version: u64,
}

/// Lock-guarded camera record shared by the control service and render loop
pub struct CameraState {
    current: Mutex<Versioned>,
    defaults: CameraParameters,
    max_resolution: Resolution,
}

impl CameraState {
    /// Create the state with its startup defaults
    pub fn new(defaults: CameraParameters) -> Self {
        Self {
            current: Mutex::new(Versioned {
                params: defaults,
                version: 0,
            }),
            defaults,
            max_resolution: Resolution::new(Resolution::MAX_WIDTH, Resolution::MAX_HEIGHT),
        }
    }

    /// Cap the resolution a control message may request
    pub fn with_max_resolution(mut self, max: Resolution) -> Self {
        self.max_resolution = max;
        self
    }

    pub fn max_resolution(&self) -> Resolution {
        self.max_resolution
    }

    /// Copy the current parameters
    pub fn snapshot(&self) -> CameraParameters {
        self.current.lock().params
    }

    /// Number of changes applied since startup
    pub fn version(&self) -> u64 {
        self.current.lock().version
    }

    /// Startup defaults
    pub fn defaults(&self) -> CameraParameters {
        self.defaults
    }

    /// Atomically apply a control message
    ///
    /// The merged result is validated before it replaces the current value;
    /// an invalid update leaves the state unchanged.
    pub fn apply(&self, message: &ControlMessage) -> Result<CameraParameters> {
        self.apply_versioned(message).map(|(params, _)| params)
    }

    /// Like [`apply`](Self::apply), also returning the version the change
    /// was stored under
    pub fn apply_versioned(&self, message: &ControlMessage) -> Result<(CameraParameters, u64)> {
        match message {
            ControlMessage::Update(update) => self.apply_update(update),
            ControlMessage::Reset => Ok(self.reset_versioned()),
        }
    }

    fn apply_update(&self, update: &CameraUpdate) -> Result<(CameraParameters, u64)> {
        let mut guard = self.current.lock();
        let next = guard.params.merged(update);
        next.validate()?;
        if !next.resolution.fits_within(self.max_resolution) {
            return Err(AppError::InvalidControl(format!(
                "resolution {} exceeds limit {}",
                next.resolution, self.max_resolution
            )));
        }
        guard.params = next;
        guard.version += 1;
        Ok((next, guard.version))
    }

    /// Restore startup defaults
    pub fn reset(&self) -> CameraParameters {
        self.reset_versioned().0
    }

    fn reset_versioned(&self) -> (CameraParameters, u64) {
        let mut guard = self.current.lock();
        guard.params = self.defaults;
        guard.version += 1;
        (self.defaults, guard.version)
    }
}

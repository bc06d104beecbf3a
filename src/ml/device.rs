use burn::prelude::*;

use crate::data::batcher::TextLineBatch;

/// Moves a collated batch onto the device the model lives on.
pub trait DeviceTransfer<B: Backend> {
    fn transfer_to_device(&self, batch: TextLineBatch<B>) -> TextLineBatch<B>;
}

/// Transfer through Burn's own `Tensor::to_device`.
///
/// `pin_memory` is accepted for parity with the CLI but Burn has
/// no pinned staging buffers; it is only reported.
#[derive(Clone, Debug)]
pub struct BackendTransfer<B: Backend> {
    /// Device the model parameters live on
    device: B::Device,
}

impl<B: Backend> BackendTransfer<B> {
    pub fn new(device: B::Device, pin_memory: bool) -> Self {
        if pin_memory {
            tracing::debug!("pin_memory requested; batches are copied with Tensor::to_device");
        }
        Self { device }
    }
}

impl<B: Backend> DeviceTransfer<B> for BackendTransfer<B> {
    fn transfer_to_device(&self, batch: TextLineBatch<B>) -> TextLineBatch<B> {
        TextLineBatch {
            images:        batch.images.to_device(&self.device),
            labels:        batch.labels.to_device(&self.device),
            label_lengths: batch.label_lengths.to_device(&self.device),
        }
    }
}

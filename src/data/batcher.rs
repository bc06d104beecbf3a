// ============================================================
// Layer 4 — Text-Line Batcher (collation)
// ============================================================
// Implements Burn's Batcher trait: N TextLineItems become one
// TextLineBatch.
//
//   images        [N, C, H, W]   stacked pixel buffers
//   labels        [ΣLᵢ]          every label, concatenated in order
//   label_lengths [N]            Lᵢ per sample
//
// CTC consumes targets in this concatenated form, so there is
// no padding: sum(label_lengths) == labels.len() always holds.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::{ImageShape, TextLineItem};

/// A collated group of samples. The last batch of an epoch may
/// hold fewer than `batch_size` samples.
#[derive(Debug, Clone)]
pub struct TextLineBatch<B: Backend> {
    /// Normalised pixels, shape [N, C, H, W]
    pub images:        Tensor<B, 4>,
    /// Every label of the batch back to back, shape [ΣLᵢ]
    pub labels:        Tensor<B, 1, Int>,
    /// Lᵢ for each sample, shape [N]
    pub label_lengths: Tensor<B, 1, Int>,
}

impl<B: Backend> TextLineBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.images.dims()[0]
    }
}

/// Collation function handed to Burn's DataLoader. The loader
/// passes the device to create tensors on with every call.
#[derive(Clone, Debug)]
pub struct TextLineBatcher {
    /// Geometry every item's pixel buffer was produced with
    pub shape: ImageShape,
}

impl TextLineBatcher {
    pub fn new(shape: ImageShape) -> Self {
        Self { shape }
    }
}

/// Concatenate labels and collect their lengths, in item order.
pub fn collate_labels(items: &[TextLineItem]) -> (Vec<i32>, Vec<i32>) {
    let labels  = items.iter().flat_map(|s| s.label.iter().map(|&c| c as i32)).collect();
    let lengths = items.iter().map(|s| s.label_len() as i32).collect();
    (labels, lengths)
}

impl<B: Backend> Batcher<B, TextLineItem, TextLineBatch<B>> for TextLineBatcher {
    fn batch(&self, items: Vec<TextLineItem>, device: &B::Device) -> TextLineBatch<B> {
        let n = items.len();
        let ImageShape { channels, height, width } = self.shape;

        // Stack pixel buffers, then restore the 4-D layout
        let pixels: Vec<f32> = items.iter().flat_map(|s| s.pixels.iter().copied()).collect();
        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), device)
            .reshape([n, channels, height, width]);

        // Targets stay unpadded: CTC reads them through label_lengths
        let (labels, lengths) = collate_labels(&items);
        let labels        = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);
        let label_lengths = Tensor::<B, 1, Int>::from_ints(lengths.as_slice(), device);

        TextLineBatch { images, labels, label_lengths }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn item(shape: ImageShape, label: Vec<u32>) -> TextLineItem {
        TextLineItem::new(vec![0.5; shape.num_values()], label)
    }

    #[test]
    fn test_label_lengths_sum_to_concatenated_length() {
        let shape = ImageShape::new(1, 4, 6);
        let items = vec![
            item(shape, vec![1, 2, 3]),
            item(shape, vec![7]),
            item(shape, vec![4, 4, 5, 6, 9]),
        ];

        let (labels, lengths) = collate_labels(&items);
        assert_eq!(lengths, vec![3, 1, 5]);
        assert_eq!(lengths.iter().sum::<i32>() as usize, labels.len());
        assert_eq!(labels, vec![1, 2, 3, 7, 4, 4, 5, 6, 9]);
    }

    #[test]
    fn test_batch_tensor_shapes() {
        let shape   = ImageShape::new(1, 4, 6);
        let batcher = TextLineBatcher::new(shape);
        let batch: TextLineBatch<TestBackend> =
            batcher.batch(vec![item(shape, vec![1, 2]), item(shape, vec![3])], &Default::default());

        assert_eq!(batch.images.dims(), [2, 1, 4, 6]);
        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.labels.dims(), [3]);

        let lengths: Vec<i64> = batch.label_lengths.into_data().iter::<i64>().collect();
        assert_eq!(lengths, vec![2, 1]);
    }
}

//! ResNet Backbone
//!
//! ResNet18 and ResNet50 expressed as Burn modules: a 7x7 stem, four
//! stages of residual blocks (basic blocks for ResNet18, bottlenecks for
//! ResNet50), and a global average pool producing the feature vector the
//! classifier head consumes.
//!
//! The module layout matches the torchvision parameterization so ImageNet
//! weights converted to a Burn record load directly.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use super::config::BackboneKind;

/// 1x1 projection shortcut used when a block changes resolution or width
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_planes: usize, out_planes: usize, stride: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_planes, out_planes], [1, 1])
            .with_stride([stride, stride])
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(out_planes).init(device);
        Self { conv, bn }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// A residual block. Basic blocks use conv1/conv2; bottlenecks add the
/// third 1x1 convolution expanding to 4x the stage width.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    conv3: Option<Conv2d<B>>,
    bn3: Option<BatchNorm<B, 2>>,
    downsample: Option<Downsample<B>>,
    relu: Relu,
}

impl<B: Backend> ResidualBlock<B> {
    /// Basic block: 3x3 stride s, 3x3 stride 1. Output width = planes.
    fn basic(in_planes: usize, planes: usize, stride: usize, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([in_planes, planes], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(planes).init(device);

        let conv2 = Conv2dConfig::new([planes, planes], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let bn2 = BatchNormConfig::new(planes).init(device);

        let downsample = (stride != 1 || in_planes != planes)
            .then(|| Downsample::new(in_planes, planes, stride, device));

        Self {
            conv1,
            bn1,
            conv2,
            bn2,
            conv3: None,
            bn3: None,
            downsample,
            relu: Relu::new(),
        }
    }

    /// Bottleneck block: 1x1, 3x3 stride s, 1x1 expand. Output width = 4 * planes.
    fn bottleneck(in_planes: usize, planes: usize, stride: usize, device: &B::Device) -> Self {
        let out_planes = planes * 4;

        let conv1 = Conv2dConfig::new([in_planes, planes], [1, 1])
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(planes).init(device);

        let conv2 = Conv2dConfig::new([planes, planes], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let bn2 = BatchNormConfig::new(planes).init(device);

        let conv3 = Conv2dConfig::new([planes, out_planes], [1, 1])
            .with_bias(false)
            .init(device);
        let bn3 = BatchNormConfig::new(out_planes).init(device);

        let downsample = (stride != 1 || in_planes != out_planes)
            .then(|| Downsample::new(in_planes, out_planes, stride, device));

        Self {
            conv1,
            bn1,
            conv2,
            bn2,
            conv3: Some(conv3),
            bn3: Some(bn3),
            downsample,
            relu: Relu::new(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(x.clone()),
            None => x.clone(),
        };

        let out = self.relu.forward(self.bn1.forward(self.conv1.forward(x)));
        let out = self.bn2.forward(self.conv2.forward(out));

        let out = match (&self.conv3, &self.bn3) {
            (Some(conv3), Some(bn3)) => {
                let out = self.relu.forward(out);
                bn3.forward(conv3.forward(out))
            }
            _ => out,
        };

        self.relu.forward(out + identity)
    }
}

/// ResNet feature extractor ending at the global average pool
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    relu: Relu,
    maxpool: MaxPool2d,
    layer1: Vec<ResidualBlock<B>>,
    layer2: Vec<ResidualBlock<B>>,
    layer3: Vec<ResidualBlock<B>>,
    layer4: Vec<ResidualBlock<B>>,
    avgpool: AdaptiveAvgPool2d,
}

impl<B: Backend> ResNet<B> {
    /// Build a randomly initialized backbone of the given kind
    pub fn new(kind: BackboneKind, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([3, 64], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(64).init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let counts = kind.block_counts();
        let mut in_planes = 64;

        let layer1 = Self::make_stage(kind, &mut in_planes, 64, counts[0], 1, device);
        let layer2 = Self::make_stage(kind, &mut in_planes, 128, counts[1], 2, device);
        let layer3 = Self::make_stage(kind, &mut in_planes, 256, counts[2], 2, device);
        let layer4 = Self::make_stage(kind, &mut in_planes, 512, counts[3], 2, device);

        Self {
            conv1,
            bn1,
            relu: Relu::new(),
            maxpool,
            layer1,
            layer2,
            layer3,
            layer4,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }

    fn make_stage(
        kind: BackboneKind,
        in_planes: &mut usize,
        planes: usize,
        blocks: usize,
        stride: usize,
        device: &B::Device,
    ) -> Vec<ResidualBlock<B>> {
        let mut stage = Vec::with_capacity(blocks);
        for i in 0..blocks {
            let block_stride = if i == 0 { stride } else { 1 };
            let block = if kind.bottleneck() {
                ResidualBlock::bottleneck(*in_planes, planes, block_stride, device)
            } else {
                ResidualBlock::basic(*in_planes, planes, block_stride, device)
            };
            *in_planes = if kind.bottleneck() { planes * 4 } else { planes };
            stage.push(block);
        }
        stage
    }

    /// Forward pass: `[batch, 3, H, W]` -> `[batch, feature_dim]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.bn1.forward(self.conv1.forward(x)));
        let mut x = self.maxpool.forward(x);

        for block in &self.layer1 {
            x = block.forward(x);
        }
        for block in &self.layer2 {
            x = block.forward(x);
        }
        for block in &self.layer3 {
            x = block.forward(x);
        }
        for block in &self.layer4 {
            x = block.forward(x);
        }

        let x = self.avgpool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        x.reshape([batch_size, channels])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    #[test]
    fn test_resnet18_feature_dim() {
        let device = Default::default();
        let model = ResNet::<DefaultBackend>::new(BackboneKind::ResNet18, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([2, 3, 64, 64], &device);
        let features = model.forward(input);

        assert_eq!(features.dims(), [2, 512]);
    }

    #[test]
    fn test_resnet50_feature_dim() {
        let device = Default::default();
        let model = ResNet::<DefaultBackend>::new(BackboneKind::ResNet50, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, 64, 64], &device);
        let features = model.forward(input);

        assert_eq!(features.dims(), [1, 2048]);
    }

    #[test]
    fn test_stage_block_counts() {
        let device: <DefaultBackend as burn::tensor::backend::Backend>::Device = Default::default();
        let model = ResNet::<DefaultBackend>::new(BackboneKind::ResNet50, &device);

        assert_eq!(model.layer1.len(), 3);
        assert_eq!(model.layer2.len(), 4);
        assert_eq!(model.layer3.len(), 6);
        assert_eq!(model.layer4.len(), 3);
    }
}

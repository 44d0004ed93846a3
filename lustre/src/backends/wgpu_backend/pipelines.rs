use glam::UVec2;
use log::debug;

/// Compute pipelines of the kernels, built once per backend.
#[derive(Debug)]
pub struct Pipelines {
    pub denoising: Pipeline,
    pub reprojection: Pipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            denoising: Self::denoising().build(
                device,
                wgpu::include_wgsl!("../../../shaders/denoising.wgsl"),
            ),

            reprojection: Self::reprojection().build(
                device,
                wgpu::include_wgsl!("../../../shaders/reprojection.wgsl"),
            ),
        }
    }

    fn denoising() -> PipelineBuilder {
        Pipeline::builder("denoising")
            .uniform()
            .texture()
            .texture()
            .texture()
            .texture()
            .storage_texture(wgpu::TextureFormat::Rgba32Float)
    }

    fn reprojection() -> PipelineBuilder {
        Pipeline::builder("reprojection")
            .uniform()
            .texture()
            .texture()
            .texture()
            .texture()
            .texture()
            .texture()
            .texture()
            .storage_texture(wgpu::TextureFormat::Rgba32Float)
            .storage_texture(wgpu::TextureFormat::R32Float)
    }
}

#[derive(Debug)]
pub struct Pipeline {
    label: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl Pipeline {
    pub fn builder(label: impl ToString) -> PipelineBuilder {
        PipelineBuilder {
            label: label.to_string(),
            entries: Default::default(),
        }
    }

    /// Records a dispatch covering `size` pixels.
    ///
    /// `resources` must follow the order in which the bindings have been
    /// declared.
    pub fn run<'a>(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        size: UVec2,
        resources: impl IntoIterator<Item = wgpu::BindingResource<'a>>,
    ) {
        let bind_group_label = format!("lustre_{}_bg", self.label);

        let entries: Vec<_> = resources
            .into_iter()
            .enumerate()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource,
            })
            .collect();

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&bind_group_label),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let label = format!("lustre_{}_pass", self.label);

        let mut pass =
            encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&label),
            });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups((size.x + 7) / 8, (size.y + 7) / 8, 1);
    }
}

pub struct PipelineBuilder {
    label: String,
    entries: Vec<wgpu::BindingType>,
}

impl PipelineBuilder {
    pub fn uniform(mut self) -> Self {
        self.entries.push(wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        });

        self
    }

    pub fn texture(mut self) -> Self {
        self.entries.push(wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        });

        self
    }

    pub fn storage_texture(mut self, format: wgpu::TextureFormat) -> Self {
        self.entries.push(wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format,
            view_dimension: wgpu::TextureViewDimension::D2,
        });

        self
    }

    pub fn build(
        self,
        device: &wgpu::Device,
        shader: wgpu::ShaderModuleDescriptor<'_>,
    ) -> Pipeline {
        debug!("Initializing pipeline: {}", self.label);

        let module = device.create_shader_module(shader);

        let entries: Vec<_> = self
            .entries
            .into_iter()
            .enumerate()
            .map(|(binding, ty)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty,
                count: None,
            })
            .collect();

        let bind_group_layout_label =
            format!("lustre_{}_bind_group_layout", self.label);

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&bind_group_layout_label),
                entries: &entries,
            });

        let pipeline_layout_label =
            format!("lustre_{}_pipeline_layout", self.label);

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&pipeline_layout_label),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline_label = format!("lustre_{}_pipeline", self.label);

        let pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&pipeline_label),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: "main",
            });

        Pipeline {
            label: self.label,
            bind_group_layout,
            pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Kind {
        Uniform,
        Texture,
        StorageTexture,
    }

    /// Parses and validates given shader, returning kinds of its bindings,
    /// ordered by their binding index.
    fn bindings(source: &str) -> Vec<(u32, Kind)> {
        let module = naga::front::wgsl::parse_str(source).unwrap();

        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .unwrap();

        let mut bindings: Vec<_> = module
            .global_variables
            .iter()
            .filter_map(|(_, var)| {
                let binding = var.binding.as_ref()?;

                assert_eq!(0, binding.group);

                let kind = match (&var.space, &module.types[var.ty].inner) {
                    (naga::AddressSpace::Uniform, _) => Kind::Uniform,

                    (
                        _,
                        naga::TypeInner::Image {
                            class: naga::ImageClass::Storage { .. },
                            ..
                        },
                    ) => Kind::StorageTexture,

                    (_, naga::TypeInner::Image { .. }) => Kind::Texture,

                    other => panic!("unexpected binding: {other:?}"),
                };

                Some((binding.binding, kind))
            })
            .collect();

        bindings.sort_by_key(|(binding, _)| *binding);
        bindings
    }

    fn layout(builder: PipelineBuilder) -> Vec<(u32, Kind)> {
        builder
            .entries
            .iter()
            .enumerate()
            .map(|(binding, ty)| {
                let kind = match ty {
                    wgpu::BindingType::Buffer { .. } => Kind::Uniform,
                    wgpu::BindingType::Texture { .. } => Kind::Texture,
                    wgpu::BindingType::StorageTexture { .. } => {
                        Kind::StorageTexture
                    }
                    other => panic!("unexpected binding: {other:?}"),
                };

                (binding as u32, kind)
            })
            .collect()
    }

    #[test]
    fn denoising() {
        assert_eq!(
            layout(Pipelines::denoising()),
            bindings(include_str!("../../../shaders/denoising.wgsl"))
        );
    }

    #[test]
    fn reprojection() {
        assert_eq!(
            layout(Pipelines::reprojection()),
            bindings(include_str!("../../../shaders/reprojection.wgsl"))
        );
    }
}

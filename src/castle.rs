//! The castle scene: layout, scene graph, appearances and their GPU side.
//!
//! [`Castle`] is pure CPU state and can be built and toggled without a GPU.
//! [`CastleGpu`] mirrors it with buffers and bind groups and draws whatever
//! appearance each node currently points at.

use wgpu::util::DeviceExt;

use crate::{
    config::SceneConstants,
    data_structures::{
        instance::{Instance, InstanceRaw},
        material::{
            castle_appearances, MaterialBinding, MaterialBindings, MaterialDesc, MaterialKey,
            MaterialMode, SurfaceCategory,
        },
        model::{DrawModel, Material, MaterialMaps, MaterialUniform, Mesh},
        scene_graph::{GeometryId, NodeKind, SceneNode},
        texture::{create_repeat_sampler, Texture},
    },
    error::CastleError,
    layout::{CastleLayout, WallSide},
    resources::{
        loader::{TextureSet, Textures},
        mesh::Geometry,
    },
};

#[derive(Debug)]
pub struct Castle {
    constants: SceneConstants,
    layout: CastleLayout,
    scene: SceneNode,
    appearances: MaterialBindings<MaterialDesc>,
    mode: MaterialMode,
}

impl Castle {
    /// Validates `constants`, places everything and builds the scene graph in
    /// flat mode.
    pub fn new(constants: SceneConstants) -> Result<Self, CastleError> {
        let layout = CastleLayout::generate(&constants)?;
        let mode = MaterialMode::default();
        let mut scene = build_scene(&layout, mode);
        scene.update_world_transforms(&[Instance::default()]);

        Ok(Self {
            constants,
            layout,
            scene,
            appearances: castle_appearances(),
            mode,
        })
    }

    /// Switches every node to the flat or textured appearance of its category.
    pub fn toggle_textures(&mut self, enabled: bool) {
        let mode = MaterialMode::from_textures_enabled(enabled);
        if mode != self.mode {
            log::info!("Switching castle materials to {:?}", mode);
        }
        self.mode = mode;
        self.scene.apply_material_mode(mode);
    }

    pub fn mode(&self) -> MaterialMode {
        self.mode
    }

    pub fn scene(&self) -> &SceneNode {
        &self.scene
    }

    pub fn layout(&self) -> &CastleLayout {
        &self.layout
    }

    pub fn appearance(&self, key: MaterialKey) -> &MaterialDesc {
        self.appearances.get(key)
    }

    pub fn geometry(&self, id: GeometryId) -> Geometry {
        let c = &self.constants;
        match id {
            GeometryId::Base => Geometry::plane(c.base.width, c.base.depth, c.base.segments),
            GeometryId::Tower => Geometry::cylinder(
                c.tower.radius_top,
                c.tower.radius_bottom,
                c.tower.height,
                c.tower.radial_segments,
            ),
            GeometryId::TowerTop => {
                let radius = c.tower.top.radius + c.tower.top.overhang;
                Geometry::cylinder(radius, radius, c.tower.top.height, c.tower.radial_segments)
            }
            GeometryId::Crenellation => {
                let [x, y, z] = c.tower.top.block;
                Geometry::cuboid(x, y, z)
            }
            GeometryId::Wall => Geometry::cuboid(c.wall.width, c.wall.height, c.wall.depth),
            GeometryId::Bush => Geometry::sphere(
                c.bush_style.radius,
                c.bush_style.segments,
                c.bush_style.segments,
            ),
        }
    }
}

fn wall_name(side: WallSide) -> &'static str {
    match side {
        WallSide::Front => "wall-front",
        WallSide::Back => "wall-back",
        WallSide::Left => "wall-left",
        WallSide::Right => "wall-right",
    }
}

fn build_scene(layout: &CastleLayout, mode: MaterialMode) -> SceneNode {
    let mut root = SceneNode::group("castle");
    root.add_child(SceneNode::mesh(
        "base",
        GeometryId::Base,
        SurfaceCategory::Floor,
        mode,
        vec![layout.base],
    ));

    for (i, tower) in layout.towers.iter().enumerate() {
        let mut group = SceneNode::group(&format!("tower-{}", i));
        group.add_child(SceneNode::mesh(
            &format!("tower-{}-body", i),
            GeometryId::Tower,
            SurfaceCategory::Tower,
            mode,
            vec![tower.body],
        ));
        group.add_child(SceneNode::mesh(
            &format!("tower-{}-top", i),
            GeometryId::TowerTop,
            SurfaceCategory::TowerTop,
            mode,
            vec![tower.top],
        ));
        group.add_child(SceneNode::mesh(
            &format!("tower-{}-crenellations", i),
            GeometryId::Crenellation,
            SurfaceCategory::TowerCubes,
            mode,
            tower.crenellations.clone(),
        ));
        root.add_child(group);
    }

    for wall in &layout.walls {
        root.add_child(SceneNode::mesh(
            wall_name(wall.side),
            GeometryId::Wall,
            SurfaceCategory::Wall,
            mode,
            vec![wall.to_instance()],
        ));
    }

    root.add_child(SceneNode::mesh(
        "bushes",
        GeometryId::Bush,
        SurfaceCategory::Bush,
        mode,
        layout.bushes.clone(),
    ));
    root
}

struct NodeBuffer {
    geometry: GeometryId,
    casts_shadow: bool,
    instances: wgpu::Buffer,
    amount: u32,
}

/// The stand-in maps of a material without textures.
struct DefaultMaps {
    color: Texture,
    arm: Texture,
    normal: Texture,
    displacement: Texture,
}

impl DefaultMaps {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            color: Texture::default_color(device, queue),
            arm: Texture::default_arm(device, queue),
            normal: Texture::default_normal(device, queue),
            displacement: Texture::default_displacement(device, queue),
        }
    }

    fn as_maps(&self) -> MaterialMaps<'_> {
        MaterialMaps {
            color: &self.color,
            arm: &self.arm,
            normal: &self.normal,
            displacement: &self.displacement,
        }
    }
}

/// GPU resources of a [`Castle`].
pub struct CastleGpu {
    meshes: Vec<Mesh>,
    // in scene traversal order, mesh nodes only
    nodes: Vec<NodeBuffer>,
    materials: MaterialBindings<Material>,
}

impl CastleGpu {
    /// Uploads geometry, instances and both appearances of every category.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        castle: &Castle,
        textures: &Textures,
    ) -> Self {
        let meshes = GeometryId::ALL
            .iter()
            .map(|&id| castle.geometry(id).upload(device, &format!("{:?}", id)))
            .collect();

        let mut nodes = Vec::new();
        castle.scene().traverse(&mut |node| {
            if let NodeKind::Mesh { geometry, category, .. } = node.kind {
                let raw: Vec<InstanceRaw> = node.world_transforms().map(Instance::to_raw).collect();
                let instances = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Instance Buffer", node.name)),
                    contents: bytemuck::cast_slice(&raw),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
                nodes.push(NodeBuffer {
                    geometry,
                    casts_shadow: category.casts_shadow(),
                    instances,
                    amount: raw.len() as u32,
                });
            }
        });

        let sampler = create_repeat_sampler(device);
        let defaults = DefaultMaps::new(device, queue);
        let materials = MaterialBindings::from_fn(|category| {
            let flat = Material::new(
                device,
                &format!("{} flat", category),
                MaterialUniform::new(
                    castle.appearance(MaterialKey::new(category, MaterialMode::Flat)),
                    [1.0, 1.0],
                    false,
                )
                .receiving_shadows(category.receives_shadow()),
                defaults.as_maps(),
                &sampler,
                layout,
            );
            let textured = textured_material(
                device,
                queue,
                layout,
                &sampler,
                &defaults,
                castle.appearance(MaterialKey::new(category, MaterialMode::Textured)),
                textures.get(category),
            );
            MaterialBinding { flat, textured }
        });

        Self {
            meshes,
            nodes,
            materials,
        }
    }

    /// Draws every mesh node with the appearance its key currently selects.
    pub fn draw<'a>(
        &'a self,
        castle: &Castle,
        render_pass: &mut wgpu::RenderPass<'a>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    ) {
        let mut keys = Vec::with_capacity(self.nodes.len());
        castle.scene().traverse(&mut |node| {
            if let Some(key) = node.material() {
                keys.push(key);
            }
        });
        for (node, key) in self.nodes.iter().zip(keys) {
            if node.amount == 0 {
                log::warn!("you attemted to render something with zero instances");
                continue;
            }
            render_pass.set_vertex_buffer(1, node.instances.slice(..));
            render_pass.draw_mesh_instanced(
                &self.meshes[node.geometry.index()],
                self.materials.get(key),
                0..node.amount,
                camera_bind_group,
                light_bind_group,
            );
        }
    }

    /// Draws the shadow casters into a pass set up by
    /// [`ShadowResources::begin_pass`](crate::pipelines::shadow::ShadowResources::begin_pass).
    pub fn draw_shadow_casters<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        for node in self.nodes.iter().filter(|n| n.casts_shadow && n.amount > 0) {
            render_pass.set_vertex_buffer(1, node.instances.slice(..));
            let mesh = &self.meshes[node.geometry.index()];
            render_pass.draw_mesh_depth_instanced(mesh, 0..node.amount);
        }
    }
}

fn textured_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    defaults: &DefaultMaps,
    desc: &MaterialDesc,
    set: &TextureSet,
) -> Material {
    let color = Texture::from_map(device, queue, &set.color);
    let arm = Texture::from_map(device, queue, &set.arm);
    let normal = Texture::from_map(device, queue, &set.normal);
    let displacement = set
        .disp
        .as_ref()
        .map(|map| Texture::from_map(device, queue, map));
    let maps = MaterialMaps {
        color: &color,
        arm: &arm,
        normal: &normal,
        displacement: displacement.as_ref().unwrap_or(&defaults.displacement),
    };
    Material::new(
        device,
        &format!("{} textured", set.category),
        MaterialUniform::new(desc, set.repeat(), set.disp.is_some())
            .receiving_shadows(set.category.receives_shadow()),
        maps,
        sampler,
        layout,
    )
}

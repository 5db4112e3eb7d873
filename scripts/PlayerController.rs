//! Moves its object back and forth along its forward axis.
//!
//! Built by the host with `rustc --crate-type cdylib` and linked against
//! `void_script_api`.

use void_script_api::prelude::*;

pub struct PlayerController {
    speed: f32,
    health: f32,
    stuff: f32,
    min_range: f32,
    max_range: f32,
    is_increasing: bool,
    nome: String,
}

impl Default for PlayerController {
    fn default() -> Self {
        Self {
            speed: 10.0,
            health: 100.0,
            stuff: 100.0,
            min_range: -10.0,
            max_range: 10.0,
            is_increasing: true,
            nome: "Ciao!".to_string(),
        }
    }
}

impl Script for PlayerController {
    fn on_create(&mut self, ctx: &mut ScriptContext<'_>) {
        ctx.log("PlayerController ready");
    }

    fn on_update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32) {
        let Some(transform) = ctx.get_component::<Transform>() else {
            return;
        };

        let scale = if self.nome == "ciao" { 1.5 } else { 1.0 };
        transform.set_scale([scale; 3]);

        let z = transform.position[2];
        if z >= self.max_range {
            self.is_increasing = false;
        } else if z <= self.min_range {
            self.is_increasing = true;
        }

        let step = self.speed * dt;
        let forward = transform.forward();
        transform.translate(forward, if self.is_increasing { -step } else { step });
    }

    fn on_destroy(&mut self) {}

    fn properties(&self) -> &'static [PropertyDescriptor] {
        const PROPS: &[PropertyDescriptor] = &[
            PropertyDescriptor::new("Speed", PropertyType::Float),
            PropertyDescriptor::new("Health", PropertyType::Float),
            PropertyDescriptor::new("Stuff", PropertyType::Float),
            PropertyDescriptor::new("minRange", PropertyType::Float),
            PropertyDescriptor::new("maxRange", PropertyType::Float),
            PropertyDescriptor::new("isIncreasing", PropertyType::Bool),
            PropertyDescriptor::new("nome", PropertyType::String),
        ];
        PROPS
    }

    fn property_mut(&mut self, name: &str) -> Option<PropertyMut<'_>> {
        match name {
            "Speed" => Some(PropertyMut::Float(&mut self.speed)),
            "Health" => Some(PropertyMut::Float(&mut self.health)),
            "Stuff" => Some(PropertyMut::Float(&mut self.stuff)),
            "minRange" => Some(PropertyMut::Float(&mut self.min_range)),
            "maxRange" => Some(PropertyMut::Float(&mut self.max_range)),
            "isIncreasing" => Some(PropertyMut::Bool(&mut self.is_increasing)),
            "nome" => Some(PropertyMut::String(&mut self.nome)),
            _ => None,
        }
    }
}

void_script_api::export_script!(PlayerController);

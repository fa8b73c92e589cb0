//! Vehicle resource pool: health, armor, gas.

#[derive(Debug, Clone)]
pub struct Character {
    pub hp: f32,
    pub max_hp: f32,
    pub armor: f32,
    pub max_armor: f32,
    pub gas: f32,
    pub max_gas: f32,
    /// Gas burned per second while the drivetrain is live.
    pub gas_consumption: f32,
    pub gas_consumption_enabled: bool,
    destroyed: bool,
}

impl Character {
    pub fn new(max_hp: f32, max_armor: f32, max_gas: f32, gas_consumption: f32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            armor: max_armor,
            max_armor,
            gas: max_gas,
            max_gas,
            gas_consumption,
            gas_consumption_enabled: true,
            destroyed: false,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn has_gas(&self) -> bool {
        self.gas > 0.0
    }

    /// Returns true if this hit destroyed the vehicle.
    pub fn take_damage(&mut self, damage: f32) -> bool {
        if self.destroyed {
            return false;
        }
        if self.hp - damage > 0.0 {
            self.hp -= damage;
            false
        } else {
            self.hp = 0.0;
            self.destroyed = true;
            true
        }
    }

    pub fn hp_recovery(&mut self, amount: f32) {
        self.hp = (self.hp + amount).min(self.max_hp);
    }

    pub fn gas_recovery(&mut self, amount: f32) {
        self.gas = (self.gas + amount).min(self.max_gas);
    }

    /// Burn gas for one tick. Returns true on the tick the tank runs dry.
    pub fn consume_gas(&mut self, dt: f32) -> bool {
        if !self.gas_consumption_enabled || self.gas <= 0.0 {
            return false;
        }
        self.gas = (self.gas - self.gas_consumption * dt).max(0.0);
        self.gas <= 0.0
    }
}

use bitmask_enum::bitmask;

/// Capabilities a role can grant. Flags combine with `|`.
#[bitmask(u32)]
pub enum Permission {
    Follow = 0x01,
    Comment = 0x02,
    WriteArticles = 0x04,
    ModerateComments = 0x08,
    Administer = 0x80,
}

impl Permission {
    /// True iff every bit of `required` is present in `self`.
    ///
    /// This is an AND check: holding any one of the requested bits is not
    /// enough.
    pub fn grants(self, required: Permission) -> bool {
        (self & required) == required
    }
}

pub const USER_ROLE: &str = "User";
pub const MODERATOR_ROLE: &str = "Moderator";
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// One row of the fixed role table applied at deployment.
#[derive(Debug, Clone, Copy)]
pub struct RoleSeed {
    pub name: &'static str,
    pub permissions: Permission,
    pub is_default: bool,
}

pub fn role_seeds() -> [RoleSeed; 3] {
    let user = Permission::Follow | Permission::Comment | Permission::WriteArticles;
    let moderator = user | Permission::ModerateComments;
    let administrator = moderator | Permission::Administer;

    [
        RoleSeed {
            name: USER_ROLE,
            permissions: user,
            is_default: true,
        },
        RoleSeed {
            name: MODERATOR_ROLE,
            permissions: moderator,
            is_default: false,
        },
        RoleSeed {
            name: ADMINISTRATOR_ROLE,
            permissions: administrator,
            is_default: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values_are_stable() {
        assert_eq!(Permission::Follow.bits(), 0x01);
        assert_eq!(Permission::Comment.bits(), 0x02);
        assert_eq!(Permission::WriteArticles.bits(), 0x04);
        assert_eq!(Permission::ModerateComments.bits(), 0x08);
        assert_eq!(Permission::Administer.bits(), 0x80);
    }

    #[test]
    fn grants_requires_all_bits() {
        let held = Permission::from(0x07);
        assert!(held.grants(Permission::Comment));
        assert!(held.grants(Permission::Follow | Permission::WriteArticles));
        assert!(!held.grants(Permission::ModerateComments));
        // one bit present, one missing
        assert!(!held.grants(Permission::Comment | Permission::ModerateComments));
    }

    #[test]
    fn empty_mask_grants_nothing_but_the_empty_set() {
        let held = Permission::none();
        assert!(!held.grants(Permission::Follow));
        assert!(held.grants(Permission::none()));
    }

    #[test]
    fn seeds_have_single_default_and_expected_masks() {
        let seeds = role_seeds();
        assert_eq!(seeds.iter().filter(|s| s.is_default).count(), 1);

        let user = seeds.iter().find(|s| s.name == USER_ROLE).unwrap();
        assert_eq!(user.permissions.bits(), 0x07);

        let moderator = seeds.iter().find(|s| s.name == MODERATOR_ROLE).unwrap();
        assert_eq!(moderator.permissions.bits(), 0x0f);

        let admin = seeds.iter().find(|s| s.name == ADMINISTRATOR_ROLE).unwrap();
        assert_eq!(admin.permissions.bits(), 0x8f);
        assert!(admin.permissions.grants(Permission::Administer));
    }
}

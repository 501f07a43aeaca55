//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden, Debug, Clone, Copy)]
pub enum Agents {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Company,
    Experience,
    ProfilePhotoUrl,
    City,
    HappyCustomers,
    SuccessfulSales,
    InstagramUrl,
    FacebookUrl,
    Slug,
    IsPremium,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Debug, Clone, Copy)]
pub enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    PasswordSalt,
    Phone,
    Company,
    AgentId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Debug, Clone, Copy)]
pub enum Properties {
    Table,
    Id,
    UserId,
    Title,
    Status,
    Category,
    Price,
    Location,
    Description,
    Tagline,
    ImageUrl,
    Area,
    Rooms,
    ZoningStatus,
    Floor,
    BuildingAge,
    Specs,
    Featured,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Debug, Clone, Copy)]
pub enum Sessions {
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
    CreatedAt,
}

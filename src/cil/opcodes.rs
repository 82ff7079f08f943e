//! Every opcode of the CIL instruction set
//!
//! The table below is the only place opcodes are described. It expands into one constant per
//! opcode, the [`ALL`] listing, and the two 256-entry lookup tables used for decoding (one indexed
//! by the single opcode byte, the other by the byte following the `0xFE` prefix). The lookup
//! tables are computed at compile time, so there is nothing to initialize at startup.

use super::opcode::{FlowControl, OpCode, OpCodeType, OperandType, StackBehaviour};

macro_rules! opcodes {
    (
        $(
            $name:ident = $code:literal, $mnemonic:literal,
            $operand:ident, $pop:ident, $push:ident, $flow:ident, $kind:ident;
        )*
    ) => {
        $(
            pub const $name: OpCode = OpCode::new(
                $code,
                $mnemonic,
                OperandType::$operand,
                StackBehaviour::$pop,
                StackBehaviour::$push,
                FlowControl::$flow,
                OpCodeType::$kind,
            );
        )*

        /// All opcodes, in encoding order
        pub const ALL: &[OpCode] = &[ $( $name ),* ];
    };
}

opcodes! {
    NOP = 0x00, "nop", InlineNone, Pop0, Push0, Next, Primitive;
    BREAK = 0x01, "break", InlineNone, Pop0, Push0, Break, Primitive;
    LDARG_0 = 0x02, "ldarg.0", InlineNone, Pop0, Push1, Next, Macro;
    LDARG_1 = 0x03, "ldarg.1", InlineNone, Pop0, Push1, Next, Macro;
    LDARG_2 = 0x04, "ldarg.2", InlineNone, Pop0, Push1, Next, Macro;
    LDARG_3 = 0x05, "ldarg.3", InlineNone, Pop0, Push1, Next, Macro;
    LDLOC_0 = 0x06, "ldloc.0", InlineNone, Pop0, Push1, Next, Macro;
    LDLOC_1 = 0x07, "ldloc.1", InlineNone, Pop0, Push1, Next, Macro;
    LDLOC_2 = 0x08, "ldloc.2", InlineNone, Pop0, Push1, Next, Macro;
    LDLOC_3 = 0x09, "ldloc.3", InlineNone, Pop0, Push1, Next, Macro;
    STLOC_0 = 0x0A, "stloc.0", InlineNone, Pop1, Push0, Next, Macro;
    STLOC_1 = 0x0B, "stloc.1", InlineNone, Pop1, Push0, Next, Macro;
    STLOC_2 = 0x0C, "stloc.2", InlineNone, Pop1, Push0, Next, Macro;
    STLOC_3 = 0x0D, "stloc.3", InlineNone, Pop1, Push0, Next, Macro;
    LDARG_S = 0x0E, "ldarg.s", ShortInlineArgument, Pop0, Push1, Next, Macro;
    LDARGA_S = 0x0F, "ldarga.s", ShortInlineArgument, Pop0, PushI, Next, Macro;
    STARG_S = 0x10, "starg.s", ShortInlineArgument, Pop1, Push0, Next, Macro;
    LDLOC_S = 0x11, "ldloc.s", ShortInlineVar, Pop0, Push1, Next, Macro;
    LDLOCA_S = 0x12, "ldloca.s", ShortInlineVar, Pop0, PushI, Next, Macro;
    STLOC_S = 0x13, "stloc.s", ShortInlineVar, Pop1, Push0, Next, Macro;
    LDNULL = 0x14, "ldnull", InlineNone, Pop0, PushRef, Next, Primitive;
    LDC_I4_M1 = 0x15, "ldc.i4.m1", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_0 = 0x16, "ldc.i4.0", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_1 = 0x17, "ldc.i4.1", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_2 = 0x18, "ldc.i4.2", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_3 = 0x19, "ldc.i4.3", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_4 = 0x1A, "ldc.i4.4", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_5 = 0x1B, "ldc.i4.5", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_6 = 0x1C, "ldc.i4.6", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_7 = 0x1D, "ldc.i4.7", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_8 = 0x1E, "ldc.i4.8", InlineNone, Pop0, PushI, Next, Macro;
    LDC_I4_S = 0x1F, "ldc.i4.s", ShortInlineI, Pop0, PushI, Next, Macro;
    LDC_I4 = 0x20, "ldc.i4", InlineI, Pop0, PushI, Next, Primitive;
    LDC_I8 = 0x21, "ldc.i8", InlineI8, Pop0, PushI8, Next, Primitive;
    LDC_R4 = 0x22, "ldc.r4", ShortInlineR, Pop0, PushR4, Next, Primitive;
    LDC_R8 = 0x23, "ldc.r8", InlineR, Pop0, PushR8, Next, Primitive;
    DUP = 0x25, "dup", InlineNone, Pop1, Push1Push1, Next, Primitive;
    POP = 0x26, "pop", InlineNone, Pop1, Push0, Next, Primitive;
    JMP = 0x27, "jmp", InlineMethod, Pop0, Push0, Call, Primitive;
    CALL = 0x28, "call", InlineMethod, VarPop, VarPush, Call, Primitive;
    CALLI = 0x29, "calli", InlineSig, VarPop, VarPush, Call, Primitive;
    RET = 0x2A, "ret", InlineNone, VarPop, Push0, Return, Primitive;
    BR_S = 0x2B, "br.s", ShortInlineBrTarget, Pop0, Push0, Branch, Macro;
    BRFALSE_S = 0x2C, "brfalse.s", ShortInlineBrTarget, PopI, Push0, CondBranch, Macro;
    BRTRUE_S = 0x2D, "brtrue.s", ShortInlineBrTarget, PopI, Push0, CondBranch, Macro;
    BEQ_S = 0x2E, "beq.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BGE_S = 0x2F, "bge.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BGT_S = 0x30, "bgt.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BLE_S = 0x31, "ble.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BLT_S = 0x32, "blt.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BNE_UN_S = 0x33, "bne.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BGE_UN_S = 0x34, "bge.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BGT_UN_S = 0x35, "bgt.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BLE_UN_S = 0x36, "ble.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BLT_UN_S = 0x37, "blt.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BR = 0x38, "br", InlineBrTarget, Pop0, Push0, Branch, Primitive;
    BRFALSE = 0x39, "brfalse", InlineBrTarget, PopI, Push0, CondBranch, Primitive;
    BRTRUE = 0x3A, "brtrue", InlineBrTarget, PopI, Push0, CondBranch, Primitive;
    BEQ = 0x3B, "beq", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BGE = 0x3C, "bge", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BGT = 0x3D, "bgt", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BLE = 0x3E, "ble", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BLT = 0x3F, "blt", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BNE_UN = 0x40, "bne.un", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BGE_UN = 0x41, "bge.un", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BGT_UN = 0x42, "bgt.un", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BLE_UN = 0x43, "ble.un", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    BLT_UN = 0x44, "blt.un", InlineBrTarget, Pop1Pop1, Push0, CondBranch, Macro;
    SWITCH = 0x45, "switch", InlineSwitch, PopI, Push0, CondBranch, Primitive;
    LDIND_I1 = 0x46, "ldind.i1", InlineNone, PopI, PushI, Next, Primitive;
    LDIND_U1 = 0x47, "ldind.u1", InlineNone, PopI, PushI, Next, Primitive;
    LDIND_I2 = 0x48, "ldind.i2", InlineNone, PopI, PushI, Next, Primitive;
    LDIND_U2 = 0x49, "ldind.u2", InlineNone, PopI, PushI, Next, Primitive;
    LDIND_I4 = 0x4A, "ldind.i4", InlineNone, PopI, PushI, Next, Primitive;
    LDIND_U4 = 0x4B, "ldind.u4", InlineNone, PopI, PushI, Next, Primitive;
    LDIND_I8 = 0x4C, "ldind.i8", InlineNone, PopI, PushI8, Next, Primitive;
    LDIND_I = 0x4D, "ldind.i", InlineNone, PopI, PushI, Next, Primitive;
    LDIND_R4 = 0x4E, "ldind.r4", InlineNone, PopI, PushR4, Next, Primitive;
    LDIND_R8 = 0x4F, "ldind.r8", InlineNone, PopI, PushR8, Next, Primitive;
    LDIND_REF = 0x50, "ldind.ref", InlineNone, PopI, PushRef, Next, Primitive;
    STIND_REF = 0x51, "stind.ref", InlineNone, PopIPopI, Push0, Next, Primitive;
    STIND_I1 = 0x52, "stind.i1", InlineNone, PopIPopI, Push0, Next, Primitive;
    STIND_I2 = 0x53, "stind.i2", InlineNone, PopIPopI, Push0, Next, Primitive;
    STIND_I4 = 0x54, "stind.i4", InlineNone, PopIPopI, Push0, Next, Primitive;
    STIND_I8 = 0x55, "stind.i8", InlineNone, PopIPopI8, Push0, Next, Primitive;
    STIND_R4 = 0x56, "stind.r4", InlineNone, PopIPopR4, Push0, Next, Primitive;
    STIND_R8 = 0x57, "stind.r8", InlineNone, PopIPopR8, Push0, Next, Primitive;
    ADD = 0x58, "add", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    SUB = 0x59, "sub", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    MUL = 0x5A, "mul", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    DIV = 0x5B, "div", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    DIV_UN = 0x5C, "div.un", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    REM = 0x5D, "rem", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    REM_UN = 0x5E, "rem.un", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    AND = 0x5F, "and", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    OR = 0x60, "or", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    XOR = 0x61, "xor", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    SHL = 0x62, "shl", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    SHR = 0x63, "shr", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    SHR_UN = 0x64, "shr.un", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    NEG = 0x65, "neg", InlineNone, Pop1, Push1, Next, Primitive;
    NOT = 0x66, "not", InlineNone, Pop1, Push1, Next, Primitive;
    CONV_I1 = 0x67, "conv.i1", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_I2 = 0x68, "conv.i2", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_I4 = 0x69, "conv.i4", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_I8 = 0x6A, "conv.i8", InlineNone, Pop1, PushI8, Next, Primitive;
    CONV_R4 = 0x6B, "conv.r4", InlineNone, Pop1, PushR4, Next, Primitive;
    CONV_R8 = 0x6C, "conv.r8", InlineNone, Pop1, PushR8, Next, Primitive;
    CONV_U4 = 0x6D, "conv.u4", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_U8 = 0x6E, "conv.u8", InlineNone, Pop1, PushI8, Next, Primitive;
    CALLVIRT = 0x6F, "callvirt", InlineMethod, VarPop, VarPush, Call, ObjectModel;
    CPOBJ = 0x70, "cpobj", InlineType, PopIPopI, Push0, Next, ObjectModel;
    LDOBJ = 0x71, "ldobj", InlineType, PopI, Push1, Next, ObjectModel;
    LDSTR = 0x72, "ldstr", InlineString, Pop0, PushRef, Next, ObjectModel;
    NEWOBJ = 0x73, "newobj", InlineMethod, VarPop, PushRef, Call, ObjectModel;
    CASTCLASS = 0x74, "castclass", InlineType, PopRef, PushRef, Next, ObjectModel;
    ISINST = 0x75, "isinst", InlineType, PopRef, PushI, Next, ObjectModel;
    CONV_R_UN = 0x76, "conv.r.un", InlineNone, Pop1, PushR8, Next, Primitive;
    UNBOX = 0x79, "unbox", InlineType, PopRef, PushI, Next, Primitive;
    THROW = 0x7A, "throw", InlineNone, PopRef, Push0, Throw, ObjectModel;
    LDFLD = 0x7B, "ldfld", InlineField, PopRef, Push1, Next, ObjectModel;
    LDFLDA = 0x7C, "ldflda", InlineField, PopRef, PushI, Next, ObjectModel;
    STFLD = 0x7D, "stfld", InlineField, PopRefPop1, Push0, Next, ObjectModel;
    LDSFLD = 0x7E, "ldsfld", InlineField, Pop0, Push1, Next, ObjectModel;
    LDSFLDA = 0x7F, "ldsflda", InlineField, Pop0, PushI, Next, ObjectModel;
    STSFLD = 0x80, "stsfld", InlineField, Pop1, Push0, Next, ObjectModel;
    STOBJ = 0x81, "stobj", InlineType, PopIPop1, Push0, Next, Primitive;
    CONV_OVF_I1_UN = 0x82, "conv.ovf.i1.un", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_I2_UN = 0x83, "conv.ovf.i2.un", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_I4_UN = 0x84, "conv.ovf.i4.un", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_I8_UN = 0x85, "conv.ovf.i8.un", InlineNone, Pop1, PushI8, Next, Primitive;
    CONV_OVF_U1_UN = 0x86, "conv.ovf.u1.un", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_U2_UN = 0x87, "conv.ovf.u2.un", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_U4_UN = 0x88, "conv.ovf.u4.un", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_U8_UN = 0x89, "conv.ovf.u8.un", InlineNone, Pop1, PushI8, Next, Primitive;
    CONV_OVF_I_UN = 0x8A, "conv.ovf.i.un", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_U_UN = 0x8B, "conv.ovf.u.un", InlineNone, Pop1, PushI, Next, Primitive;
    BOX = 0x8C, "box", InlineType, Pop1, PushRef, Next, Primitive;
    NEWARR = 0x8D, "newarr", InlineType, PopI, PushRef, Next, ObjectModel;
    LDLEN = 0x8E, "ldlen", InlineNone, PopRef, PushI, Next, ObjectModel;
    LDELEMA = 0x8F, "ldelema", InlineType, PopRefPopI, PushI, Next, ObjectModel;
    LDELEM_I1 = 0x90, "ldelem.i1", InlineNone, PopRefPopI, PushI, Next, ObjectModel;
    LDELEM_U1 = 0x91, "ldelem.u1", InlineNone, PopRefPopI, PushI, Next, ObjectModel;
    LDELEM_I2 = 0x92, "ldelem.i2", InlineNone, PopRefPopI, PushI, Next, ObjectModel;
    LDELEM_U2 = 0x93, "ldelem.u2", InlineNone, PopRefPopI, PushI, Next, ObjectModel;
    LDELEM_I4 = 0x94, "ldelem.i4", InlineNone, PopRefPopI, PushI, Next, ObjectModel;
    LDELEM_U4 = 0x95, "ldelem.u4", InlineNone, PopRefPopI, PushI, Next, ObjectModel;
    LDELEM_I8 = 0x96, "ldelem.i8", InlineNone, PopRefPopI, PushI8, Next, ObjectModel;
    LDELEM_I = 0x97, "ldelem.i", InlineNone, PopRefPopI, PushI, Next, ObjectModel;
    LDELEM_R4 = 0x98, "ldelem.r4", InlineNone, PopRefPopI, PushR4, Next, ObjectModel;
    LDELEM_R8 = 0x99, "ldelem.r8", InlineNone, PopRefPopI, PushR8, Next, ObjectModel;
    LDELEM_REF = 0x9A, "ldelem.ref", InlineNone, PopRefPopI, PushRef, Next, ObjectModel;
    STELEM_I = 0x9B, "stelem.i", InlineNone, PopRefPopIPopI, Push0, Next, ObjectModel;
    STELEM_I1 = 0x9C, "stelem.i1", InlineNone, PopRefPopIPopI, Push0, Next, ObjectModel;
    STELEM_I2 = 0x9D, "stelem.i2", InlineNone, PopRefPopIPopI, Push0, Next, ObjectModel;
    STELEM_I4 = 0x9E, "stelem.i4", InlineNone, PopRefPopIPopI, Push0, Next, ObjectModel;
    STELEM_I8 = 0x9F, "stelem.i8", InlineNone, PopRefPopIPopI8, Push0, Next, ObjectModel;
    STELEM_R4 = 0xA0, "stelem.r4", InlineNone, PopRefPopIPopR4, Push0, Next, ObjectModel;
    STELEM_R8 = 0xA1, "stelem.r8", InlineNone, PopRefPopIPopR8, Push0, Next, ObjectModel;
    STELEM_REF = 0xA2, "stelem.ref", InlineNone, PopRefPopIPopRef, Push0, Next, ObjectModel;
    LDELEM = 0xA3, "ldelem", InlineType, PopRefPopI, Push1, Next, ObjectModel;
    STELEM = 0xA4, "stelem", InlineType, PopRefPopIPop1, Push0, Next, ObjectModel;
    UNBOX_ANY = 0xA5, "unbox.any", InlineType, PopRef, Push1, Next, ObjectModel;
    CONV_OVF_I1 = 0xB3, "conv.ovf.i1", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_U1 = 0xB4, "conv.ovf.u1", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_I2 = 0xB5, "conv.ovf.i2", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_U2 = 0xB6, "conv.ovf.u2", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_I4 = 0xB7, "conv.ovf.i4", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_U4 = 0xB8, "conv.ovf.u4", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_I8 = 0xB9, "conv.ovf.i8", InlineNone, Pop1, PushI8, Next, Primitive;
    CONV_OVF_U8 = 0xBA, "conv.ovf.u8", InlineNone, Pop1, PushI8, Next, Primitive;
    REFANYVAL = 0xC2, "refanyval", InlineType, Pop1, PushI, Next, Primitive;
    CKFINITE = 0xC3, "ckfinite", InlineNone, Pop1, PushR8, Next, Primitive;
    MKREFANY = 0xC6, "mkrefany", InlineType, PopI, Push1, Next, Primitive;
    LDTOKEN = 0xD0, "ldtoken", InlineTok, Pop0, PushI, Next, Primitive;
    CONV_U2 = 0xD1, "conv.u2", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_U1 = 0xD2, "conv.u1", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_I = 0xD3, "conv.i", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_I = 0xD4, "conv.ovf.i", InlineNone, Pop1, PushI, Next, Primitive;
    CONV_OVF_U = 0xD5, "conv.ovf.u", InlineNone, Pop1, PushI, Next, Primitive;
    ADD_OVF = 0xD6, "add.ovf", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    ADD_OVF_UN = 0xD7, "add.ovf.un", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    MUL_OVF = 0xD8, "mul.ovf", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    MUL_OVF_UN = 0xD9, "mul.ovf.un", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    SUB_OVF = 0xDA, "sub.ovf", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    SUB_OVF_UN = 0xDB, "sub.ovf.un", InlineNone, Pop1Pop1, Push1, Next, Primitive;
    ENDFINALLY = 0xDC, "endfinally", InlineNone, Pop0, Push0, Return, Primitive;
    LEAVE = 0xDD, "leave", InlineBrTarget, PopAll, Push0, Branch, Primitive;
    LEAVE_S = 0xDE, "leave.s", ShortInlineBrTarget, PopAll, Push0, Branch, Primitive;
    STIND_I = 0xDF, "stind.i", InlineNone, PopIPopI, Push0, Next, Primitive;
    CONV_U = 0xE0, "conv.u", InlineNone, Pop1, PushI, Next, Primitive;
    ARGLIST = 0xFE00, "arglist", InlineNone, Pop0, PushI, Next, Primitive;
    CEQ = 0xFE01, "ceq", InlineNone, Pop1Pop1, PushI, Next, Primitive;
    CGT = 0xFE02, "cgt", InlineNone, Pop1Pop1, PushI, Next, Primitive;
    CGT_UN = 0xFE03, "cgt.un", InlineNone, Pop1Pop1, PushI, Next, Primitive;
    CLT = 0xFE04, "clt", InlineNone, Pop1Pop1, PushI, Next, Primitive;
    CLT_UN = 0xFE05, "clt.un", InlineNone, Pop1Pop1, PushI, Next, Primitive;
    LDFTN = 0xFE06, "ldftn", InlineMethod, Pop0, PushI, Next, Primitive;
    LDVIRTFTN = 0xFE07, "ldvirtftn", InlineMethod, PopRef, PushI, Next, Primitive;
    LDARG = 0xFE09, "ldarg", InlineArgument, Pop0, Push1, Next, Primitive;
    LDARGA = 0xFE0A, "ldarga", InlineArgument, Pop0, PushI, Next, Primitive;
    STARG = 0xFE0B, "starg", InlineArgument, Pop1, Push0, Next, Primitive;
    LDLOC = 0xFE0C, "ldloc", InlineVar, Pop0, Push1, Next, Primitive;
    LDLOCA = 0xFE0D, "ldloca", InlineVar, Pop0, PushI, Next, Primitive;
    STLOC = 0xFE0E, "stloc", InlineVar, Pop1, Push0, Next, Primitive;
    LOCALLOC = 0xFE0F, "localloc", InlineNone, PopI, PushI, Next, Primitive;
    ENDFILTER = 0xFE11, "endfilter", InlineNone, PopI, Push0, Return, Primitive;
    UNALIGNED = 0xFE12, "unaligned.", ShortInlineI, Pop0, Push0, Meta, Prefix;
    VOLATILE = 0xFE13, "volatile.", InlineNone, Pop0, Push0, Meta, Prefix;
    TAILCALL = 0xFE14, "tail.", InlineNone, Pop0, Push0, Meta, Prefix;
    INITOBJ = 0xFE15, "initobj", InlineType, PopI, Push0, Next, ObjectModel;
    CONSTRAINED = 0xFE16, "constrained.", InlineType, Pop0, Push0, Meta, Prefix;
    CPBLK = 0xFE17, "cpblk", InlineNone, PopIPopIPopI, Push0, Next, Primitive;
    INITBLK = 0xFE18, "initblk", InlineNone, PopIPopIPopI, Push0, Next, Primitive;
    NO = 0xFE19, "no.", ShortInlineI, Pop0, Push0, Meta, Prefix;
    RETHROW = 0xFE1A, "rethrow", InlineNone, Pop0, Push0, Throw, ObjectModel;
    SIZEOF = 0xFE1C, "sizeof", InlineType, Pop0, PushI, Next, Primitive;
    REFANYTYPE = 0xFE1D, "refanytype", InlineNone, Pop1, PushI, Next, Primitive;
    READONLY = 0xFE1E, "readonly.", InlineNone, Pop0, Push0, Meta, Prefix;
}

const fn lookup_table(extended: bool) -> [Option<OpCode>; 256] {
    let mut table: [Option<OpCode>; 256] = [None; 256];
    let mut i = 0;
    while i < ALL.len() {
        let opcode = ALL[i];
        if opcode.is_extended() == extended {
            table[opcode.table_byte() as usize] = Some(opcode);
        }
        i += 1;
    }
    table
}

/// Single-byte opcodes, indexed by their byte
pub static SINGLE_BYTE_TABLE: [Option<OpCode>; 256] = lookup_table(false);

/// Two-byte opcodes, indexed by the byte after the `0xFE` prefix
pub static EXTENDED_TABLE: [Option<OpCode>; 256] = lookup_table(true);
